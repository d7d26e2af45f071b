use super::host::{HostSurface, InitRequest};
use super::overlay::{CommittedOverlay, TransientOverlay};
use super::{
    PointerDisposition, Surface, SurfaceEvent, SurfaceId, SurfaceRequest, UnmatchedInput,
};
use crate::browser::init::InitEvent;
use crate::browser::injection::{
    spawn_pointer_worker, InjectionBridge, InjectionSender, PointerInfoBuilder,
};
use crate::ink::geometry::{overlay_bounds, ClientRect, DirtyRect, OverlayPlacement};
use crate::ink::model::{CommittedLayer, PointerKind};
use crate::ink::pointer::PointerSample;
use crate::ink::render::PaintTarget;
use crate::ink::transparency::HitTest;
use crate::settings::Settings;
use anyhow::bail;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::thread::JoinHandle;

pub const HOST_ID: SurfaceId = SurfaceId(1);
pub const TRANSIENT_ID: SurfaceId = SurfaceId(2);
pub const COMMITTED_ID: SurfaceId = SurfaceId(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Done,
    HitTest(HitTest),
    UnknownSurface,
}

/// Owns every surface and routes platform events to them by identity.
pub struct AppContext {
    host: HostSurface,
    transient: TransientOverlay,
    committed: CommittedOverlay,
    layer: Rc<RefCell<CommittedLayer>>,
    placement: OverlayPlacement,
    unmatched: UnmatchedInput,
    log_pointer_events: bool,
    injection: InjectionBridge,
    requests: Vec<SurfaceRequest>,
}

impl AppContext {
    pub fn new(settings: &Settings) -> Self {
        Self::with_injection(settings, InjectionBridge::new())
    }

    pub fn with_injection(settings: &Settings, injection: InjectionBridge) -> Self {
        let layer = Rc::new(RefCell::new(CommittedLayer::default()));
        let transient = TransientOverlay::new(
            TRANSIENT_ID,
            COMMITTED_ID,
            settings.capture_config(),
            settings.transient_transparency,
            layer.clone(),
        )
        .with_hover_cursor(settings.show_hover_cursor);
        let committed =
            CommittedOverlay::new(COMMITTED_ID, settings.committed_transparency, layer.clone());
        Self {
            host: HostSurface::new(HOST_ID, settings.content.clone()),
            transient,
            committed,
            layer,
            placement: settings.overlay_placement,
            unmatched: settings.unmatched_input,
            log_pointer_events: settings.log_pointer_events,
            injection,
            requests: Vec::new(),
        }
    }

    pub fn host(&self) -> &HostSurface {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut HostSurface {
        &mut self.host
    }

    pub fn transient(&self) -> &TransientOverlay {
        &self.transient
    }

    pub fn committed_overlay(&mut self) -> &mut CommittedOverlay {
        &mut self.committed
    }

    pub fn committed_layer(&self) -> Ref<'_, CommittedLayer> {
        self.layer.borrow()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&dyn Surface> {
        match id {
            HOST_ID => Some(&self.host),
            TRANSIENT_ID => Some(&self.transient),
            COMMITTED_ID => Some(&self.committed),
            _ => None,
        }
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut dyn Surface> {
        match id {
            HOST_ID => Some(&mut self.host),
            TRANSIENT_ID => Some(&mut self.transient),
            COMMITTED_ID => Some(&mut self.committed),
            _ => None,
        }
    }

    pub fn dispatch(&mut self, id: SurfaceId, event: SurfaceEvent) -> Dispatched {
        if self.surface(id).is_none() {
            tracing::debug!(?id, "event for unknown surface");
            return Dispatched::UnknownSurface;
        }
        match event {
            SurfaceEvent::Resized(client) if id == HOST_ID => {
                self.resize_host(client);
                Dispatched::Done
            }
            SurfaceEvent::Moved if id == HOST_ID => {
                for overlay in [TRANSIENT_ID, COMMITTED_ID] {
                    if let Some(surface) = self.surface(overlay) {
                        let bounds = surface.bounds();
                        self.requests.push(SurfaceRequest::Reposition {
                            surface: overlay,
                            bounds,
                        });
                    }
                }
                Dispatched::Done
            }
            SurfaceEvent::Resized(_) | SurfaceEvent::Moved => Dispatched::Done,
            SurfaceEvent::Pointer(sample) => {
                self.route_pointer(id, sample);
                Dispatched::Done
            }
            SurfaceEvent::HitTest(point) => match self.surface(id) {
                Some(surface) => Dispatched::HitTest(surface.hit_test(point)),
                None => Dispatched::UnknownSurface,
            },
        }
    }

    fn resize_host(&mut self, client: ClientRect) {
        let client = ClientRect::from_size(client.width, client.height);
        tracing::debug!(width = client.width, height = client.height, "host resized");
        let overlay = overlay_bounds(self.placement, client);
        let requests = &mut self.requests;
        self.host.handle_resize(client, requests);
        self.committed.handle_resize(overlay, requests);
        self.transient.handle_resize(overlay, requests);
    }

    fn route_pointer(&mut self, id: SurfaceId, sample: PointerSample) {
        if self.log_pointer_events {
            tracing::debug!(target: "ink_layers::pointer", surface = id.0, "{sample}");
        }
        let Some(surface) = self.surface_mut(id) else {
            return;
        };
        let mut requests = Vec::new();
        let disposition = surface.handle_pointer_event(&sample, &mut requests);
        self.requests.append(&mut requests);

        if let PointerDisposition::Unmatched(host_sample) = disposition {
            match self.unmatched {
                UnmatchedInput::Ignore => {}
                UnmatchedInput::ForwardToBrowser => {
                    self.host.forward(&host_sample);
                }
                UnmatchedInput::ClickThrough => {
                    self.requests.push(SurfaceRequest::Redirect {
                        sample: host_sample,
                    });
                }
            }
        }
    }

    pub fn paint(&mut self, id: SurfaceId, target: &mut dyn PaintTarget, rect: Option<DirtyRect>) {
        if let Some(surface) = self.surface_mut(id) {
            surface.handle_paint(target, rect);
        }
    }

    /// Requests queued by the last dispatches, oldest first.
    pub fn take_requests(&mut self) -> Vec<SurfaceRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn handle_init<E>(&mut self, event: InitEvent<E>) -> Option<InitRequest<E>> {
        self.host.handle_init(event, &mut self.requests)
    }

    pub fn injection_sender(&self) -> InjectionSender {
        self.injection.sender()
    }

    /// Hands a host-space pen or touch sample to a worker thread, which builds
    /// the pointer and posts it back over the injection bridge.
    pub fn inject_from_worker(&self, sample: &PointerSample) -> anyhow::Result<JoinHandle<()>> {
        if !matches!(sample.kind, PointerKind::Pen | PointerKind::Touch) {
            bail!("{} input cannot be injected as a pointer", sample.kind.label());
        }
        let location = self.host.to_control_space(sample.position);
        let builder = PointerInfoBuilder::from_sample(sample, location)?;
        spawn_pointer_worker(self.injection.sender(), builder)
    }

    /// Submits pointers queued by worker threads. Returns how many were sent.
    pub fn drain_injections(&mut self) -> usize {
        let host = &mut self.host;
        self.injection.drain(|pointer| host.inject(pointer))
    }
}
