//! The embedded web control as seen by the host surface.
//!
//! Everything here is platform neutral; the WebView2 binding lives in
//! `platform::webview` and implements [`BrowserControl`].

pub mod init;
pub mod injection;

use crate::ink::geometry::ClientRect;
use crate::ink::model::Point;
use crate::ink::pointer::{PointerButton, PointerPhase, PointerSample};
use injection::InjectedPointer;
use serde::{Deserialize, Serialize};

pub const DEMO_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <h1>Hello World</h1>
  <p>Write on the page with a stylus. Mouse and touch reach the page as usual.</p>
  <p>Finished strokes stay on the committed layer until the window closes.</p>
</body></html>
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContentSource {
    Url(String),
    Html(String),
}

impl Default for ContentSource {
    fn default() -> Self {
        Self::Html(DEMO_PAGE.to_string())
    }
}

/// Operations the host needs from a created browser controller.
pub trait BrowserControl {
    fn set_bounds(&mut self, bounds: ClientRect) -> anyhow::Result<()>;
    fn set_visible(&mut self, visible: bool) -> anyhow::Result<()>;
    fn navigate(&mut self, content: &ContentSource) -> anyhow::Result<()>;
    fn send_mouse_input(&mut self, event: &SyntheticMouseEvent) -> anyhow::Result<()>;
    fn send_pointer_input(&mut self, pointer: InjectedPointer) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Move,
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
    MiddleDown,
    MiddleUp,
    Wheel,
    Leave,
}

impl MouseEventKind {
    /// Window message code the browser control expects for this kind.
    pub fn code(self) -> i32 {
        match self {
            Self::Move => 0x0200,
            Self::LeftDown => 0x0201,
            Self::LeftUp => 0x0202,
            Self::RightDown => 0x0204,
            Self::RightUp => 0x0205,
            Self::MiddleDown => 0x0207,
            Self::MiddleUp => 0x0208,
            Self::Wheel => 0x020A,
            Self::Leave => 0x02A3,
        }
    }

    fn for_button(button: PointerButton, down: bool) -> Self {
        match (button, down) {
            (PointerButton::Secondary, true) => Self::RightDown,
            (PointerButton::Secondary, false) => Self::RightUp,
            (PointerButton::Middle, true) => Self::MiddleDown,
            (PointerButton::Middle, false) => Self::MiddleUp,
            (PointerButton::Primary | PointerButton::None, true) => Self::LeftDown,
            (PointerButton::Primary | PointerButton::None, false) => Self::LeftUp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtualKeys(pub i32);

impl VirtualKeys {
    pub const NONE: Self = Self(0);
    pub const LEFT_BUTTON: Self = Self(0x1);
    pub const RIGHT_BUTTON: Self = Self(0x2);
    pub const SHIFT: Self = Self(0x4);
    pub const CONTROL: Self = Self(0x8);
    pub const MIDDLE_BUTTON: Self = Self(0x10);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn from_sample(sample: &PointerSample) -> Self {
        let mut keys = Self::NONE;
        if sample.pressed.primary {
            keys = keys | Self::LEFT_BUTTON;
        }
        if sample.pressed.secondary {
            keys = keys | Self::RIGHT_BUTTON;
        }
        if sample.pressed.middle {
            keys = keys | Self::MIDDLE_BUTTON;
        }
        if sample.keys.shift {
            keys = keys | Self::SHIFT;
        }
        if sample.keys.ctrl {
            keys = keys | Self::CONTROL;
        }
        keys
    }
}

impl std::ops::BitOr for VirtualKeys {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Mouse input synthesized for the control, in control coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticMouseEvent {
    pub kind: MouseEventKind,
    pub keys: VirtualKeys,
    /// Wheel delta for `Wheel`, zero otherwise.
    pub mouse_data: i32,
    pub point: Point,
}

impl SyntheticMouseEvent {
    /// Returns `None` for phases that have no mouse equivalent.
    pub fn from_sample(sample: &PointerSample, point: Point) -> Option<Self> {
        let (kind, mouse_data) = match sample.phase {
            PointerPhase::Down => (MouseEventKind::for_button(sample.button, true), 0),
            PointerPhase::Up => (MouseEventKind::for_button(sample.button, false), 0),
            PointerPhase::Update => (MouseEventKind::Move, 0),
            PointerPhase::Wheel { delta } => (MouseEventKind::Wheel, delta as i32),
            PointerPhase::Leave => (MouseEventKind::Leave, 0),
            PointerPhase::CaptureLost => return None,
        };
        Some(Self {
            kind,
            keys: VirtualKeys::from_sample(sample),
            mouse_data,
            point,
        })
    }
}
