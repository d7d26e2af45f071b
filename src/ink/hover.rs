use crate::ink::geometry::DirtyRect;
use crate::ink::model::Point;
use crate::ink::pointer::{PointerPhase, PointerSample};

pub const CURSOR_DOT_RADIUS: i32 = 5;

/// Where the accepted pointer currently is: away, hovering, or in contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerState {
    #[default]
    Released,
    Hovered(Point),
    Pressed(Point),
}

impl PointerState {
    pub fn position(self) -> Option<Point> {
        match self {
            Self::Released => None,
            Self::Hovered(point) | Self::Pressed(point) => Some(point),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HoverTracker {
    state: PointerState,
}

impl HoverTracker {
    pub fn state(&self) -> PointerState {
        self.state
    }

    /// Updates the state and returns the area that needs repainting, if the
    /// visible cursor moved.
    pub fn update(&mut self, sample: &PointerSample) -> Option<DirtyRect> {
        let next = match sample.phase {
            PointerPhase::Down => PointerState::Pressed(sample.position),
            PointerPhase::Update if sample.flags.in_contact => {
                PointerState::Pressed(sample.position)
            }
            PointerPhase::Update | PointerPhase::Up => PointerState::Hovered(sample.position),
            PointerPhase::Leave | PointerPhase::CaptureLost => PointerState::Released,
            PointerPhase::Wheel { .. } => return None,
        };
        self.replace(next)
    }

    pub fn release(&mut self) -> Option<DirtyRect> {
        self.replace(PointerState::Released)
    }

    fn replace(&mut self, next: PointerState) -> Option<DirtyRect> {
        if next == self.state {
            return None;
        }
        let before = self.state.position().map(dot_bounds);
        let after = next.position().map(dot_bounds);
        self.state = next;
        match (before, after) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        }
    }
}

pub fn dot_bounds(center: Point) -> DirtyRect {
    DirtyRect::from_points(center, center, CURSOR_DOT_RADIUS + 1)
}
