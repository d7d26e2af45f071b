pub mod capture;
pub mod geometry;
pub mod hover;
pub mod model;
pub mod pointer;
pub mod render;
pub mod transparency;

pub use capture::{CaptureConfig, CaptureOutcome, CaptureState, CommitMode, StrokeCapture};
pub use geometry::{ClientRect, DirtyRect, OverlayPlacement};
pub use model::{
    Color, CommittedLayer, Point, PointerFilter, PointerKind, Stroke, StrokeStyle, TransientLayer,
};
pub use pointer::{PointerPhase, PointerSample};
pub use transparency::{HitTest, InputTransparency, TransparencyConfig, VisualTransparency};
