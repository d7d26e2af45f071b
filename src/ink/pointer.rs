use crate::ink::model::{Point, PointerKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Update,
    Up,
    Wheel { delta: i16 },
    /// Capture was taken away or the contact was cancelled.
    CaptureLost,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    None,
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerFlags {
    pub in_contact: bool,
    pub primary: bool,
    /// `false` hints at an unintended touch such as a palm.
    pub confidence: bool,
    pub canceled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    pub shift: bool,
    pub ctrl: bool,
}

/// One pointer message, decoded into platform-neutral form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    pub id: u32,
    pub kind: PointerKind,
    pub phase: PointerPhase,
    /// Location in host-window client coordinates.
    pub position: Point,
    pub screen: Point,
    pub flags: PointerFlags,
    /// Button whose state changed with this sample.
    pub button: PointerButton,
    pub pressed: PressedButtons,
    pub keys: KeyState,
    pub pressure: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PressedButtons {
    pub primary: bool,
    pub secondary: bool,
    pub middle: bool,
}

impl PointerSample {
    pub fn new(id: u32, kind: PointerKind, phase: PointerPhase, position: Point) -> Self {
        let in_contact = matches!(phase, PointerPhase::Down | PointerPhase::Update);
        Self {
            id,
            kind,
            phase,
            position,
            screen: position,
            flags: PointerFlags {
                in_contact,
                primary: true,
                confidence: true,
                canceled: false,
            },
            button: if matches!(phase, PointerPhase::Down | PointerPhase::Up) {
                PointerButton::Primary
            } else {
                PointerButton::None
            },
            pressed: PressedButtons {
                primary: in_contact,
                ..Default::default()
            },
            keys: KeyState::default(),
            pressure: None,
        }
    }

    pub fn down(id: u32, kind: PointerKind, position: impl Into<Point>) -> Self {
        Self::new(id, kind, PointerPhase::Down, position.into())
    }

    pub fn update(id: u32, kind: PointerKind, position: impl Into<Point>) -> Self {
        Self::new(id, kind, PointerPhase::Update, position.into())
    }

    pub fn up(id: u32, kind: PointerKind, position: impl Into<Point>) -> Self {
        Self::new(id, kind, PointerPhase::Up, position.into())
    }

    pub fn hover(id: u32, kind: PointerKind, position: impl Into<Point>) -> Self {
        let mut sample = Self::new(id, kind, PointerPhase::Update, position.into());
        sample.flags.in_contact = false;
        sample.pressed = PressedButtons::default();
        sample
    }

    pub fn with_screen(mut self, screen: Point) -> Self {
        self.screen = screen;
        self
    }

    pub fn with_pressure(mut self, pressure: u32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    /// Same sample, expressed relative to a different origin.
    pub fn translated(mut self, dx: i32, dy: i32) -> Self {
        self.position = self.position.offset(dx, dy);
        self
    }
}

impl fmt::Display for PointerSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.phase {
            PointerPhase::Down => "DOWN",
            PointerPhase::Up => "UP",
            PointerPhase::Update if self.flags.in_contact => "MOVE",
            PointerPhase::Update => "HOVER",
            PointerPhase::Wheel { .. } => "WHEEL",
            PointerPhase::CaptureLost => "CAPTURE LOST",
            PointerPhase::Leave => "LEAVE",
        };
        write!(
            f,
            "{} {} id={} at ({}, {})",
            self.kind.label(),
            action,
            self.id,
            self.position.x,
            self.position.y
        )?;
        if let Some(pressure) = self.pressure {
            write!(f, " pressure={pressure}")?;
        }
        if self.kind == PointerKind::Touch {
            write!(
                f,
                " primary={} confidence={}",
                self.flags.primary, self.flags.confidence
            )?;
        }
        Ok(())
    }
}
