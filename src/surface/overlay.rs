use super::{PointerDisposition, Surface, SurfaceId, SurfaceRequest, SurfaceRole};
use crate::ink::capture::{CaptureConfig, CaptureOutcome, StrokeCapture};
use crate::ink::geometry::{ClientRect, DirtyRect};
use crate::ink::hover::{HoverTracker, PointerState, CURSOR_DOT_RADIUS};
use crate::ink::model::{Color, CommittedLayer, Point};
use crate::ink::pointer::{PointerPhase, PointerSample};
use crate::ink::render::{CachedLayer, LayerBuffer, PaintTarget};
use crate::ink::transparency::{HitTest, TransparencyConfig};
use std::cell::RefCell;
use std::rc::Rc;

pub const HOVER_DOT_COLOR: Color = Color::rgb(0, 120, 215);

/// Top overlay: captures ink input and shows the stroke in progress.
pub struct TransientOverlay {
    id: SurfaceId,
    committed_id: SurfaceId,
    bounds: ClientRect,
    capture: StrokeCapture,
    hover: HoverTracker,
    show_hover_cursor: bool,
    transparency: TransparencyConfig,
    buffer: LayerBuffer,
    committed: Rc<RefCell<CommittedLayer>>,
}

impl TransientOverlay {
    pub fn new(
        id: SurfaceId,
        committed_id: SurfaceId,
        config: CaptureConfig,
        transparency: TransparencyConfig,
        committed: Rc<RefCell<CommittedLayer>>,
    ) -> Self {
        let mut config = config;
        if let Some(key) = transparency.visual.colorkey() {
            config.style.color = config.style.color.avoid_colorkey(key);
        }
        Self {
            id,
            committed_id,
            bounds: ClientRect::default(),
            capture: StrokeCapture::new(config),
            hover: HoverTracker::default(),
            show_hover_cursor: false,
            transparency,
            buffer: LayerBuffer::new((0, 0), transparency.clear_color()),
            committed,
        }
    }

    pub fn with_hover_cursor(mut self, show: bool) -> Self {
        self.show_hover_cursor = show;
        self
    }

    pub fn capture(&self) -> &StrokeCapture {
        &self.capture
    }

    pub fn pointer_state(&self) -> PointerState {
        self.hover.state()
    }

    pub fn buffer(&self) -> &LayerBuffer {
        &self.buffer
    }

    /// Clears and redraws `dirty` (host space) and asks for it to be repainted.
    fn repaint(&mut self, dirty: DirtyRect, requests: &mut Vec<SurfaceRequest>) {
        let local = dirty.offset(-self.bounds.x, -self.bounds.y);
        self.buffer.clear_rect(local);
        if let Some(stroke) = self.capture.transient().stroke() {
            self.buffer
                .draw_stroke(stroke, self.bounds.origin(), Some(local));
        }
        if self.show_hover_cursor {
            let (center, color) = match self.hover.state() {
                PointerState::Released => (None, HOVER_DOT_COLOR),
                PointerState::Hovered(p) => (Some(p), HOVER_DOT_COLOR),
                PointerState::Pressed(p) => (Some(p), self.capture.config().style.color),
            };
            if let Some(center) = center {
                let center = self.bounds.to_local(center);
                self.buffer
                    .fill_dot(center, CURSOR_DOT_RADIUS, color, Some(local));
            }
        }
        requests.push(SurfaceRequest::Invalidate {
            surface: self.id,
            rect: Some(local),
        });
    }

    fn redraw_all(&mut self) {
        self.buffer.clear_all();
        if let Some(stroke) = self.capture.transient().stroke() {
            self.buffer.draw_stroke(stroke, self.bounds.origin(), None);
        }
    }
}

impl Surface for TransientOverlay {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn role(&self) -> SurfaceRole {
        SurfaceRole::TransientOverlay
    }

    fn bounds(&self) -> ClientRect {
        self.bounds
    }

    fn handle_resize(&mut self, bounds: ClientRect, requests: &mut Vec<SurfaceRequest>) {
        self.bounds = bounds;
        self.buffer.resize(bounds.size());
        self.redraw_all();
        requests.push(SurfaceRequest::Reposition {
            surface: self.id,
            bounds,
        });
        requests.push(SurfaceRequest::Invalidate {
            surface: self.id,
            rect: None,
        });
    }

    fn handle_pointer_event(
        &mut self,
        sample: &PointerSample,
        requests: &mut Vec<SurfaceRequest>,
    ) -> PointerDisposition {
        let host_sample = sample.translated(self.bounds.x, self.bounds.y);

        let outcome = {
            let mut committed = self.committed.borrow_mut();
            self.capture.handle(&host_sample, &mut committed)
        };

        let accepted = self.capture.accepts(host_sample.kind);
        let finished = matches!(outcome, CaptureOutcome::Finished { .. });
        let mut dirty = outcome.dirty();
        if accepted || finished {
            if let Some(cursor) = self.hover.update(&host_sample) {
                if self.show_hover_cursor {
                    dirty = Some(dirty.map_or(cursor, |d| d.union(cursor)));
                }
            }
        }

        match &outcome {
            CaptureOutcome::Started { pointer_id, .. } => {
                requests.push(SurfaceRequest::CapturePointer {
                    surface: self.id,
                    pointer_id: *pointer_id,
                });
            }
            CaptureOutcome::Finished {
                pointer_id,
                committed,
                dirty: finished,
            } => {
                requests.push(SurfaceRequest::ReleasePointer {
                    surface: self.id,
                    pointer_id: *pointer_id,
                });
                if *committed {
                    requests.push(SurfaceRequest::Invalidate {
                        surface: self.committed_id,
                        rect: Some(finished.offset(-self.bounds.x, -self.bounds.y)),
                    });
                }
            }
            CaptureOutcome::Extended { .. } | CaptureOutcome::Ignored => {}
            CaptureOutcome::Rejected(kind) => {
                tracing::trace!(?kind, "pointer kind not accepted for ink");
            }
        }

        if let Some(dirty) = dirty {
            self.repaint(dirty, requests);
        }

        let consumed = match outcome {
            CaptureOutcome::Started { .. }
            | CaptureOutcome::Extended { .. }
            | CaptureOutcome::Finished { .. } => true,
            // Wheel input never draws, so it belongs to the page.
            CaptureOutcome::Ignored => {
                accepted && !matches!(host_sample.phase, PointerPhase::Wheel { .. })
            }
            CaptureOutcome::Rejected(_) => false,
        };
        if consumed {
            PointerDisposition::Handled
        } else {
            PointerDisposition::Unmatched(host_sample)
        }
    }

    fn handle_paint(&mut self, target: &mut dyn PaintTarget, rect: Option<DirtyRect>) {
        self.buffer.present(target, rect);
    }

    fn hit_test(&self, point: Point) -> HitTest {
        self.transparency
            .hit_test(point, |p| self.buffer.pixel(p))
    }
}

/// Bottom overlay: shows every committed stroke and lets input through.
pub struct CommittedOverlay {
    id: SurfaceId,
    bounds: ClientRect,
    transparency: TransparencyConfig,
    cache: CachedLayer,
    layer: Rc<RefCell<CommittedLayer>>,
}

impl CommittedOverlay {
    pub fn new(
        id: SurfaceId,
        transparency: TransparencyConfig,
        layer: Rc<RefCell<CommittedLayer>>,
    ) -> Self {
        Self {
            id,
            bounds: ClientRect::default(),
            transparency,
            cache: CachedLayer::new(transparency.clear_color()),
            layer,
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.layer.borrow().len()
    }

    fn refresh(&mut self) -> bool {
        let layer = self.layer.borrow();
        self.cache.refresh(
            layer.strokes(),
            layer.revision(),
            self.bounds.size(),
            self.bounds.origin(),
        )
    }

    pub fn buffer(&mut self) -> &LayerBuffer {
        self.refresh();
        self.cache.buffer()
    }
}

impl Surface for CommittedOverlay {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn role(&self) -> SurfaceRole {
        SurfaceRole::CommittedOverlay
    }

    fn bounds(&self) -> ClientRect {
        self.bounds
    }

    fn handle_resize(&mut self, bounds: ClientRect, requests: &mut Vec<SurfaceRequest>) {
        if bounds != self.bounds {
            self.cache.invalidate();
        }
        self.bounds = bounds;
        requests.push(SurfaceRequest::Reposition {
            surface: self.id,
            bounds,
        });
        requests.push(SurfaceRequest::Invalidate {
            surface: self.id,
            rect: None,
        });
    }

    fn handle_pointer_event(
        &mut self,
        sample: &PointerSample,
        _requests: &mut Vec<SurfaceRequest>,
    ) -> PointerDisposition {
        PointerDisposition::Unmatched(sample.translated(self.bounds.x, self.bounds.y))
    }

    fn handle_paint(&mut self, target: &mut dyn PaintTarget, rect: Option<DirtyRect>) {
        if self.refresh() {
            tracing::trace!(revision = self.layer.borrow().revision(), "committed layer re-rendered");
        }
        self.cache.buffer().present(target, rect);
    }

    fn hit_test(&self, point: Point) -> HitTest {
        self.transparency
            .hit_test(point, |p| self.cache.buffer().pixel(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::model::{PointerKind, DEFAULT_TRANSPARENCY_COLORKEY};
    use crate::ink::transparency::{InputTransparency, VisualTransparency};

    fn overlay(offset: ClientRect) -> (TransientOverlay, Rc<RefCell<CommittedLayer>>) {
        let layer = Rc::new(RefCell::new(CommittedLayer::default()));
        let mut overlay = TransientOverlay::new(
            SurfaceId(2),
            SurfaceId(3),
            CaptureConfig::default(),
            TransparencyConfig::transient_default(),
            layer.clone(),
        );
        overlay.handle_resize(offset, &mut Vec::new());
        (overlay, layer)
    }

    #[test]
    fn stroke_requests_capture_then_release_and_committed_repaint() {
        let (mut overlay, layer) = overlay(ClientRect::from_size(200, 200));
        let mut requests = Vec::new();

        overlay.handle_pointer_event(&PointerSample::down(5, PointerKind::Pen, (10, 10)), &mut requests);
        assert!(requests.contains(&SurfaceRequest::CapturePointer {
            surface: SurfaceId(2),
            pointer_id: 5
        }));
        assert_eq!(overlay.buffer().pixel(Point::new(10, 10)), Some(Color::rgb(255, 0, 0)));

        requests.clear();
        overlay.handle_pointer_event(&PointerSample::up(5, PointerKind::Pen, (20, 10)), &mut requests);
        assert!(requests.contains(&SurfaceRequest::ReleasePointer {
            surface: SurfaceId(2),
            pointer_id: 5
        }));
        assert!(requests
            .iter()
            .any(|r| matches!(r, SurfaceRequest::Invalidate { surface: SurfaceId(3), .. })));
        assert_eq!(layer.borrow().len(), 1);
        assert_eq!(
            overlay.buffer().pixel(Point::new(10, 10)),
            Some(DEFAULT_TRANSPARENCY_COLORKEY)
        );
    }

    #[test]
    fn centered_overlay_records_points_in_host_space() {
        let (mut overlay, layer) = overlay(ClientRect::new(100, 50, 200, 100));
        let mut requests = Vec::new();
        overlay.handle_pointer_event(&PointerSample::down(1, PointerKind::Pen, (5, 5)), &mut requests);
        overlay.handle_pointer_event(&PointerSample::up(1, PointerKind::Pen, (15, 5)), &mut requests);
        let layer = layer.borrow();
        assert_eq!(layer.strokes()[0].points(), &[Point::new(105, 55), Point::new(115, 55)]);
    }

    #[test]
    fn rejected_kind_comes_back_unmatched_in_host_space() {
        let (mut overlay, _) = overlay(ClientRect::new(100, 50, 200, 100));
        let disposition = overlay.handle_pointer_event(
            &PointerSample::down(9, PointerKind::Mouse, (5, 5)),
            &mut Vec::new(),
        );
        match disposition {
            PointerDisposition::Unmatched(sample) => assert_eq!(sample.position, Point::new(105, 55)),
            PointerDisposition::Handled => panic!("mouse must not be inked"),
        }
    }

    #[test]
    fn wheel_from_accepted_kind_goes_to_the_page() {
        let (mut overlay, _) = overlay(ClientRect::from_size(200, 100));
        let wheel = PointerSample::new(
            3,
            PointerKind::Pen,
            PointerPhase::Wheel { delta: -120 },
            Point::new(20, 20),
        );
        let disposition = overlay.handle_pointer_event(&wheel, &mut Vec::new());
        assert_eq!(disposition, PointerDisposition::Unmatched(wheel));

        let hover = PointerSample::hover(3, PointerKind::Pen, (20, 20));
        assert_eq!(
            overlay.handle_pointer_event(&hover, &mut Vec::new()),
            PointerDisposition::Handled
        );
    }

    #[test]
    fn capture_loss_of_unknown_kind_finishes_the_stroke() {
        let (mut overlay, layer) = overlay(ClientRect::from_size(200, 100));
        let mut requests = Vec::new();
        overlay.handle_pointer_event(&PointerSample::down(7, PointerKind::Pen, (10, 10)), &mut requests);
        overlay.handle_pointer_event(&PointerSample::update(7, PointerKind::Pen, (30, 10)), &mut requests);

        let lost = PointerSample::new(7, PointerKind::Unknown, PointerPhase::CaptureLost, Point::default());
        assert_eq!(
            overlay.handle_pointer_event(&lost, &mut requests),
            PointerDisposition::Handled
        );
        assert!(!overlay.capture().is_drawing());
        assert_eq!(layer.borrow().len(), 1);
        assert_eq!(overlay.pointer_state(), PointerState::Released);
        assert!(requests
            .iter()
            .any(|r| matches!(r, SurfaceRequest::ReleasePointer { pointer_id: 7, .. })));
    }

    #[test]
    fn colorkeyed_hit_test_follows_painted_pixels() {
        let layer = Rc::new(RefCell::new(CommittedLayer::default()));
        let mut overlay = TransientOverlay::new(
            SurfaceId(2),
            SurfaceId(3),
            CaptureConfig::default(),
            TransparencyConfig::new(VisualTransparency::default(), InputTransparency::ColorKeyed),
            layer,
        );
        overlay.handle_resize(ClientRect::from_size(50, 50), &mut Vec::new());
        assert_eq!(overlay.hit_test(Point::new(10, 10)), HitTest::Transparent);

        overlay.handle_pointer_event(&PointerSample::down(1, PointerKind::Pen, (10, 10)), &mut Vec::new());
        assert_eq!(overlay.hit_test(Point::new(10, 10)), HitTest::Client);
        assert_eq!(overlay.hit_test(Point::new(40, 40)), HitTest::Transparent);
    }

    #[test]
    fn hover_dot_is_drawn_and_removed() {
        let (overlay, _) = overlay(ClientRect::from_size(50, 50));
        let mut overlay = overlay.with_hover_cursor(true);
        let mut requests = Vec::new();
        overlay.handle_pointer_event(&PointerSample::hover(1, PointerKind::Pen, (20, 20)), &mut requests);
        assert_eq!(overlay.buffer().pixel(Point::new(20, 20)), Some(HOVER_DOT_COLOR));
        assert_eq!(overlay.pointer_state(), PointerState::Hovered(Point::new(20, 20)));

        let leave = PointerSample::new(1, PointerKind::Pen, PointerPhase::Leave, Point::new(20, 20));
        overlay.handle_pointer_event(&leave, &mut requests);
        assert_eq!(
            overlay.buffer().pixel(Point::new(20, 20)),
            Some(DEFAULT_TRANSPARENCY_COLORKEY)
        );
    }

    #[test]
    fn committed_overlay_renders_new_revisions() {
        let layer = Rc::new(RefCell::new(CommittedLayer::default()));
        let mut committed = CommittedOverlay::new(
            SurfaceId(3),
            TransparencyConfig::committed_default(),
            layer.clone(),
        );
        committed.handle_resize(ClientRect::from_size(40, 40), &mut Vec::new());
        assert_eq!(
            committed.buffer().pixel(Point::new(5, 5)),
            Some(DEFAULT_TRANSPARENCY_COLORKEY)
        );

        let mut capture = StrokeCapture::new(CaptureConfig::default());
        capture.handle(&PointerSample::down(1, PointerKind::Pen, (5, 5)), &mut layer.borrow_mut());
        capture.handle(&PointerSample::up(1, PointerKind::Pen, (25, 5)), &mut layer.borrow_mut());

        assert_eq!(committed.buffer().pixel(Point::new(5, 5)), Some(Color::rgb(0, 0, 0)));
        assert_eq!(committed.hit_test(Point::new(5, 5)), HitTest::Transparent);
        assert_eq!(committed.stroke_count(), 1);
    }
}
