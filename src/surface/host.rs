use super::{PointerDisposition, Surface, SurfaceId, SurfaceRequest, SurfaceRole};
use crate::browser::init::{BrowserInit, InitEvent, InitState, InitStep};
use crate::browser::injection::InjectedPointer;
use crate::browser::{BrowserControl, ContentSource, SyntheticMouseEvent};
use crate::ink::geometry::{ClientRect, DirtyRect};
use crate::ink::model::{Point, PointerKind};
use crate::ink::pointer::PointerSample;
use crate::ink::render::PaintTarget;
use crate::ink::transparency::HitTest;

type ReadyCallback = Box<dyn FnOnce(&mut dyn BrowserControl)>;

/// Request the platform must issue to move browser init forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitRequest<E> {
    Environment,
    Controller(E),
}

/// The window that embeds the browser control.
pub struct HostSurface {
    id: SurfaceId,
    bounds: ClientRect,
    content: ContentSource,
    init: BrowserInit,
    control: Option<Box<dyn BrowserControl>>,
    on_ready: Vec<ReadyCallback>,
}

impl HostSurface {
    pub fn new(id: SurfaceId, content: ContentSource) -> Self {
        Self {
            id,
            bounds: ClientRect::default(),
            content,
            init: BrowserInit::default(),
            control: None,
            on_ready: Vec::new(),
        }
    }

    pub fn init_state(&self) -> InitState {
        self.init.state()
    }

    pub fn is_ready(&self) -> bool {
        self.control.is_some()
    }

    pub fn content(&self) -> &ContentSource {
        &self.content
    }

    /// Runs `callback` once the control exists, immediately if it already does.
    pub fn on_ready<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut dyn BrowserControl) + 'static,
    {
        match self.control.as_deref_mut() {
            Some(control) => callback(control),
            None => self.on_ready.push(Box::new(callback)),
        }
    }

    pub fn handle_init<E>(
        &mut self,
        event: InitEvent<E>,
        requests: &mut Vec<SurfaceRequest>,
    ) -> Option<InitRequest<E>> {
        match self.init.advance(event) {
            InitStep::Nothing => None,
            InitStep::RequestEnvironment => Some(InitRequest::Environment),
            InitStep::RequestController(env) => Some(InitRequest::Controller(env)),
            InitStep::Ready(control) => {
                self.attach(control);
                None
            }
            InitStep::Failed { stage, error } => {
                self.on_ready.clear();
                requests.push(SurfaceRequest::InitFailed {
                    stage,
                    message: format!("{error:#}"),
                });
                None
            }
        }
    }

    fn attach(&mut self, mut control: Box<dyn BrowserControl>) {
        if let Err(e) = control.set_bounds(self.bounds) {
            tracing::warn!(error = %e, "failed to size browser control");
        }
        if let Err(e) = control.set_visible(true) {
            tracing::warn!(error = %e, "failed to show browser control");
        }
        if let Err(e) = control.navigate(&self.content) {
            tracing::warn!(error = %e, "navigation request failed");
        }
        for callback in self.on_ready.drain(..) {
            callback(control.as_mut());
        }
        self.control = Some(control);
    }

    /// Host client point in the control's coordinate space.
    pub fn to_control_space(&self, point: Point) -> Point {
        self.bounds.to_local(point)
    }

    /// Delivers a host-space sample to the control as mouse or pointer input.
    pub fn forward(&mut self, sample: &PointerSample) -> bool {
        let point = self.to_control_space(sample.position);
        let Some(control) = self.control.as_mut() else {
            tracing::debug!(%sample, "browser not ready, dropping forwarded input");
            return false;
        };
        let result = match sample.kind {
            PointerKind::Pen | PointerKind::Touch => {
                match InjectedPointer::from_sample(sample, point) {
                    Ok(pointer) => control.send_pointer_input(pointer),
                    Err(e) => {
                        tracing::debug!(error = %e, "sample not injectable");
                        return false;
                    }
                }
            }
            PointerKind::Mouse | PointerKind::Touchpad | PointerKind::Unknown => {
                let Some(event) = SyntheticMouseEvent::from_sample(sample, point) else {
                    return false;
                };
                control.send_mouse_input(&event)
            }
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "browser rejected forwarded input");
                false
            }
        }
    }

    pub fn inject(&mut self, pointer: InjectedPointer) {
        match self.control.as_mut() {
            Some(control) => {
                if let Err(e) = control.send_pointer_input(pointer) {
                    tracing::warn!(error = %e, "pointer injection failed");
                }
            }
            None => tracing::debug!(?pointer, "browser not ready, dropping injected pointer"),
        }
    }
}

impl Surface for HostSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn role(&self) -> SurfaceRole {
        SurfaceRole::Host
    }

    fn bounds(&self) -> ClientRect {
        self.bounds
    }

    fn handle_resize(&mut self, bounds: ClientRect, _requests: &mut Vec<SurfaceRequest>) {
        self.bounds = bounds;
        if let Some(control) = self.control.as_mut() {
            if let Err(e) = control.set_bounds(bounds) {
                tracing::warn!(error = %e, "failed to resize browser control");
            }
        }
    }

    fn handle_pointer_event(
        &mut self,
        sample: &PointerSample,
        _requests: &mut Vec<SurfaceRequest>,
    ) -> PointerDisposition {
        self.forward(sample);
        PointerDisposition::Handled
    }

    fn handle_paint(&mut self, _target: &mut dyn PaintTarget, _rect: Option<DirtyRect>) {}

    fn hit_test(&self, _point: Point) -> HitTest {
        HitTest::Client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MouseEventKind;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        bounds: Vec<ClientRect>,
        visible: Vec<bool>,
        navigations: Vec<ContentSource>,
        mouse: Vec<SyntheticMouseEvent>,
        pointers: Vec<InjectedPointer>,
    }

    struct FakeControl(Rc<RefCell<Log>>);

    impl BrowserControl for FakeControl {
        fn set_bounds(&mut self, bounds: ClientRect) -> anyhow::Result<()> {
            self.0.borrow_mut().bounds.push(bounds);
            Ok(())
        }
        fn set_visible(&mut self, visible: bool) -> anyhow::Result<()> {
            self.0.borrow_mut().visible.push(visible);
            Ok(())
        }
        fn navigate(&mut self, content: &ContentSource) -> anyhow::Result<()> {
            self.0.borrow_mut().navigations.push(content.clone());
            Ok(())
        }
        fn send_mouse_input(&mut self, event: &SyntheticMouseEvent) -> anyhow::Result<()> {
            self.0.borrow_mut().mouse.push(*event);
            Ok(())
        }
        fn send_pointer_input(&mut self, pointer: InjectedPointer) -> anyhow::Result<()> {
            self.0.borrow_mut().pointers.push(pointer);
            Ok(())
        }
    }

    fn ready_host(log: &Rc<RefCell<Log>>) -> HostSurface {
        let mut host = HostSurface::new(SurfaceId(1), ContentSource::Url("about:blank".into()));
        let mut requests = Vec::new();
        host.handle_resize(ClientRect::from_size(800, 600), &mut requests);
        host.handle_init::<()>(InitEvent::Start, &mut requests);
        host.handle_init(InitEvent::EnvironmentCreated(Ok(())), &mut requests);
        host.handle_init::<()>(
            InitEvent::ControllerCreated(Ok(Box::new(FakeControl(log.clone())))),
            &mut requests,
        );
        host
    }

    #[test]
    fn ready_control_gets_bounds_visibility_and_content() {
        let log = Rc::new(RefCell::new(Log::default()));
        let host = ready_host(&log);
        assert!(host.is_ready());
        let log = log.borrow();
        assert_eq!(log.bounds, vec![ClientRect::from_size(800, 600)]);
        assert_eq!(log.visible, vec![true]);
        assert_eq!(log.navigations, vec![ContentSource::Url("about:blank".into())]);
    }

    #[test]
    fn init_requests_follow_the_state_machine() {
        let mut host = HostSurface::new(SurfaceId(1), ContentSource::default());
        let mut requests = Vec::new();
        assert_eq!(
            host.handle_init::<u8>(InitEvent::Start, &mut requests),
            Some(InitRequest::Environment)
        );
        assert_eq!(host.handle_init::<u8>(InitEvent::Start, &mut requests), None);
        assert_eq!(
            host.handle_init(InitEvent::EnvironmentCreated(Ok(9u8)), &mut requests),
            Some(InitRequest::Controller(9))
        );
        assert!(requests.is_empty());
    }

    #[test]
    fn failure_is_reported_and_host_stays_blank() {
        let mut host = HostSurface::new(SurfaceId(1), ContentSource::default());
        let mut requests = Vec::new();
        host.handle_init::<()>(InitEvent::Start, &mut requests);
        host.handle_init::<()>(InitEvent::EnvironmentCreated(Err(anyhow!("runtime missing"))), &mut requests);
        assert!(!host.is_ready());
        assert!(matches!(
            requests.as_slice(),
            [SurfaceRequest::InitFailed { message, .. }] if message.contains("runtime missing")
        ));
        assert!(!host.forward(&PointerSample::down(1, PointerKind::Mouse, (1, 1))));
    }

    #[test]
    fn ready_callbacks_run_once_in_order() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut host = HostSurface::new(SurfaceId(1), ContentSource::default());
        let order = Rc::new(RefCell::new(Vec::new()));
        let early = order.clone();
        host.on_ready(move |_| early.borrow_mut().push("early"));

        let mut requests = Vec::new();
        host.handle_init::<()>(InitEvent::Start, &mut requests);
        host.handle_init(InitEvent::EnvironmentCreated(Ok(())), &mut requests);
        host.handle_init::<()>(
            InitEvent::ControllerCreated(Ok(Box::new(FakeControl(log)))),
            &mut requests,
        );

        let late = order.clone();
        host.on_ready(move |_| late.borrow_mut().push("late"));
        assert_eq!(*order.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn resize_before_ready_is_applied_on_attach() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut host = HostSurface::new(SurfaceId(1), ContentSource::Url("about:blank".into()));
        let mut requests = Vec::new();
        host.handle_init::<()>(InitEvent::Start, &mut requests);
        host.handle_init(InitEvent::EnvironmentCreated(Ok(())), &mut requests);
        host.handle_resize(ClientRect::from_size(1024, 768), &mut requests);
        assert!(log.borrow().bounds.is_empty());

        host.handle_init::<()>(
            InitEvent::ControllerCreated(Ok(Box::new(FakeControl(log.clone())))),
            &mut requests,
        );
        assert_eq!(log.borrow().bounds, vec![ClientRect::from_size(1024, 768)]);
    }

    #[test]
    fn resize_after_ready_reaches_the_control() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut host = ready_host(&log);
        let mut requests = Vec::new();
        host.handle_resize(ClientRect::from_size(1024, 768), &mut requests);
        assert_eq!(
            log.borrow().bounds.last().copied(),
            Some(ClientRect::from_size(1024, 768))
        );
    }

    #[test]
    fn mouse_and_pen_take_different_input_paths() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut host = ready_host(&log);

        assert!(host.forward(&PointerSample::down(1, PointerKind::Mouse, (50, 50))));
        assert!(host.forward(&PointerSample::update(2, PointerKind::Pen, (60, 60))));

        let log = log.borrow();
        assert_eq!(log.mouse.len(), 1);
        assert_eq!(log.mouse[0].kind, MouseEventKind::LeftDown);
        assert_eq!(log.mouse[0].point, Point::new(50, 50));
        assert_eq!(log.pointers.len(), 1);
        assert_eq!(log.pointers[0].location, Point::new(60, 60));
    }
}
