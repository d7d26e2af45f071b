//! Host and overlay surfaces behind one interface.
//!
//! Surfaces never touch window handles. Anything that needs the windowing
//! system is queued as a [`SurfaceRequest`] and applied by the platform once
//! dispatch has returned, so a window procedure is never re-entered while
//! surface state is borrowed.

pub mod dispatch;
pub mod host;
pub mod overlay;

use crate::browser::init::InitStage;
use crate::ink::geometry::{ClientRect, DirtyRect};
use crate::ink::model::Point;
use crate::ink::pointer::PointerSample;
use crate::ink::render::PaintTarget;
use crate::ink::transparency::HitTest;
use serde::{Deserialize, Serialize};

pub use dispatch::{AppContext, Dispatched};
pub use host::HostSurface;
pub use overlay::{CommittedOverlay, TransientOverlay};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    Host,
    TransientOverlay,
    CommittedOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// What to do with pointer input the transient overlay does not ink with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedInput {
    Ignore,
    /// Synthesize mouse or pointer input on the browser control directly.
    #[default]
    ForwardToBrowser,
    /// Re-deliver the raw event to the host window beneath the overlay.
    ClickThrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceRequest {
    Invalidate {
        surface: SurfaceId,
        rect: Option<DirtyRect>,
    },
    CapturePointer {
        surface: SurfaceId,
        pointer_id: u32,
    },
    ReleasePointer {
        surface: SurfaceId,
        pointer_id: u32,
    },
    /// New bounds in host client coordinates.
    Reposition {
        surface: SurfaceId,
        bounds: ClientRect,
    },
    /// Sample in host client coordinates, to be re-posted to the host window.
    Redirect {
        sample: PointerSample,
    },
    InitFailed {
        stage: InitStage,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Host client rectangle after a size change.
    Resized(ClientRect),
    /// The host moved on screen without changing size.
    Moved,
    /// Sample with its position in the receiving surface's client space.
    Pointer(PointerSample),
    HitTest(Point),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerDisposition {
    Handled,
    /// Not for this surface. The sample is in host client coordinates.
    Unmatched(PointerSample),
}

pub trait Surface {
    fn id(&self) -> SurfaceId;
    fn role(&self) -> SurfaceRole;
    /// Current bounds in host client coordinates.
    fn bounds(&self) -> ClientRect;
    fn handle_resize(&mut self, bounds: ClientRect, requests: &mut Vec<SurfaceRequest>);
    fn handle_pointer_event(
        &mut self,
        sample: &PointerSample,
        requests: &mut Vec<SurfaceRequest>,
    ) -> PointerDisposition;
    fn handle_paint(&mut self, target: &mut dyn PaintTarget, rect: Option<DirtyRect>);
    /// `point` is in the surface's own client space.
    fn hit_test(&self, point: Point) -> HitTest;
}
