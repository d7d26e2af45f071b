use crate::ink::geometry::DirtyRect;
use crate::ink::model::{
    CommittedLayer, Point, PointerFilter, PointerKind, Stroke, StrokeStyle, TransientLayer,
};
use crate::ink::pointer::{PointerPhase, PointerSample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Finished strokes move into the committed layer.
    #[default]
    Commit,
    /// Finished strokes stay on the transient layer until the next stroke starts.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub filter: PointerFilter,
    pub style: StrokeStyle,
    pub commit_style: StrokeStyle,
    pub commit_mode: CommitMode,
    /// Updates closer than this to the previous point are dropped.
    pub min_point_distance: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            filter: PointerFilter::PenOnly,
            style: StrokeStyle::default(),
            commit_style: StrokeStyle {
                width: 3,
                color: crate::ink::model::Color::rgb(0, 0, 0),
            },
            commit_mode: CommitMode::Commit,
            min_point_distance: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Drawing { pointer_id: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Started {
        pointer_id: u32,
        dirty: DirtyRect,
    },
    Extended {
        dirty: DirtyRect,
    },
    Finished {
        pointer_id: u32,
        committed: bool,
        dirty: DirtyRect,
    },
    Rejected(PointerKind),
    Ignored,
}

impl CaptureOutcome {
    pub fn dirty(&self) -> Option<DirtyRect> {
        match self {
            Self::Started { dirty, .. }
            | Self::Extended { dirty }
            | Self::Finished { dirty, .. } => Some(*dirty),
            Self::Rejected(_) | Self::Ignored => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeCapture {
    config: CaptureConfig,
    state: CaptureState,
    transient: TransientLayer,
}

impl StrokeCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: CaptureState::Idle,
            transient: TransientLayer::default(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn transient(&self) -> &TransientLayer {
        &self.transient
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, CaptureState::Drawing { .. })
    }

    pub fn accepts(&self, kind: PointerKind) -> bool {
        self.config.filter.accepts(kind)
    }

    pub fn handle(&mut self, sample: &PointerSample, committed: &mut CommittedLayer) -> CaptureOutcome {
        match sample.phase {
            PointerPhase::Down => self.handle_down(sample, committed),
            PointerPhase::Update => self.handle_update(sample),
            PointerPhase::Up | PointerPhase::CaptureLost => {
                self.handle_up(sample, committed)
            }
            PointerPhase::Wheel { .. } | PointerPhase::Leave => CaptureOutcome::Ignored,
        }
    }

    fn handle_down(&mut self, sample: &PointerSample, committed: &mut CommittedLayer) -> CaptureOutcome {
        if !self.accepts(sample.kind) {
            return CaptureOutcome::Rejected(sample.kind);
        }

        let mut dirty = None;
        match self.state {
            CaptureState::Drawing { pointer_id } if pointer_id != sample.id => {
                return CaptureOutcome::Ignored;
            }
            CaptureState::Drawing { pointer_id } => {
                tracing::debug!(pointer_id, "pointer down while drawing, finishing previous stroke");
                if let CaptureOutcome::Finished { dirty: finished, .. } =
                    self.finish(pointer_id, None, committed)
                {
                    dirty = Some(finished);
                }
            }
            CaptureState::Idle => {}
        }

        if let Some(previous) = self.transient.take() {
            let bounds = stroke_bounds(&previous);
            dirty = Some(dirty.map_or(bounds, |d| d.union(bounds)));
        }

        let start = sample.position;
        self.transient
            .set(Stroke::begin(sample.id, self.config.style, start));
        self.state = CaptureState::Drawing {
            pointer_id: sample.id,
        };

        let started = DirtyRect::for_segment(start, start, self.config.style.width);
        CaptureOutcome::Started {
            pointer_id: sample.id,
            dirty: dirty.map_or(started, |d| d.union(started)),
        }
    }

    fn handle_update(&mut self, sample: &PointerSample) -> CaptureOutcome {
        let CaptureState::Drawing { pointer_id } = self.state else {
            return CaptureOutcome::Ignored;
        };
        if pointer_id != sample.id {
            return CaptureOutcome::Ignored;
        }
        match self.append(sample.position) {
            Some(dirty) => CaptureOutcome::Extended { dirty },
            None => CaptureOutcome::Ignored,
        }
    }

    fn handle_up(&mut self, sample: &PointerSample, committed: &mut CommittedLayer) -> CaptureOutcome {
        match self.state {
            CaptureState::Drawing { pointer_id } if pointer_id == sample.id => {
                let last = (sample.phase == PointerPhase::Up).then_some(sample.position);
                self.finish(pointer_id, last, committed)
            }
            _ => CaptureOutcome::Ignored,
        }
    }

    fn append(&mut self, point: Point) -> Option<DirtyRect> {
        let min_distance = self.config.min_point_distance;
        let stroke = self.transient.stroke_mut()?;
        let last = stroke.last();
        if !should_append_point(last, point, min_distance) {
            return None;
        }
        stroke.push(point);
        Some(DirtyRect::for_segment(last, point, stroke.style.width))
    }

    fn finish(
        &mut self,
        pointer_id: u32,
        last: Option<Point>,
        committed: &mut CommittedLayer,
    ) -> CaptureOutcome {
        let mut dirty = last.and_then(|point| self.append(point));
        self.state = CaptureState::Idle;

        let Some(bounds) = self.transient.stroke().map(stroke_bounds) else {
            return CaptureOutcome::Ignored;
        };
        dirty = Some(dirty.map_or(bounds, |d| d.union(bounds)));

        let commit = self.config.commit_mode == CommitMode::Commit;
        if commit {
            if let Some(stroke) = self.transient.take() {
                committed.commit(stroke.with_style(self.config.commit_style));
            }
        }

        CaptureOutcome::Finished {
            pointer_id,
            committed: commit,
            dirty: dirty.unwrap_or(bounds),
        }
    }
}

fn should_append_point(last: Point, point: Point, min_distance: u32) -> bool {
    let min_sq = (min_distance as i64 * min_distance as i64).max(1);
    last.distance_sq(point) >= min_sq
}

/// Padded bounding box covering every segment of the stroke.
pub fn stroke_bounds(stroke: &Stroke) -> DirtyRect {
    let first = stroke.start();
    let mut rect = DirtyRect::for_segment(first, first, stroke.style.width);
    for pair in stroke.points().windows(2) {
        rect = rect.union(DirtyRect::for_segment(pair[0], pair[1], stroke.style.width));
    }
    rect
}
