//! Pointer-info injection into the browser control.
//!
//! Pointer payloads are plain values. Worker threads send them through an
//! [`InjectionBridge`] channel and the UI thread drains and submits them, so
//! ownership moves with the value and every payload is submitted once.

use crate::ink::model::{Point, PointerKind};
use crate::ink::pointer::{PointerPhase, PointerSample};
use anyhow::{anyhow, bail};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub const PEN_PRESSURE_MAX: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Update,
    Up,
    Enter,
    Leave,
    CaptureChanged,
}

impl PointerEventKind {
    /// `WM_POINTER*` message code the control expects.
    pub fn code(self) -> i32 {
        match self {
            Self::Update => 0x0245,
            Self::Down => 0x0246,
            Self::Up => 0x0247,
            Self::Enter => 0x0249,
            Self::Leave => 0x024A,
            Self::CaptureChanged => 0x024C,
        }
    }

    pub fn from_phase(phase: PointerPhase) -> Option<Self> {
        match phase {
            PointerPhase::Down => Some(Self::Down),
            PointerPhase::Update => Some(Self::Update),
            PointerPhase::Up => Some(Self::Up),
            PointerPhase::Leave => Some(Self::Leave),
            PointerPhase::CaptureLost => Some(Self::CaptureChanged),
            PointerPhase::Wheel { .. } => None,
        }
    }
}

/// `POINTER_FLAG_*` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactFlags(pub u32);

impl ContactFlags {
    pub const NONE: Self = Self(0);
    pub const NEW: Self = Self(0x0000_0001);
    pub const IN_RANGE: Self = Self(0x0000_0002);
    pub const IN_CONTACT: Self = Self(0x0000_0004);
    pub const FIRST_BUTTON: Self = Self(0x0000_0010);
    pub const PRIMARY: Self = Self(0x0000_2000);
    pub const CONFIDENCE: Self = Self(0x0000_4000);
    pub const CANCELED: Self = Self(0x0000_8000);
    pub const DOWN: Self = Self(0x0001_0000);
    pub const UPDATE: Self = Self(0x0002_0000);
    pub const UP: Self = Self(0x0004_0000);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn from_sample(sample: &PointerSample) -> Self {
        let mut flags = match sample.phase {
            PointerPhase::Down => Self::NEW | Self::IN_RANGE | Self::DOWN,
            PointerPhase::Update => Self::IN_RANGE | Self::UPDATE,
            PointerPhase::Up => Self::IN_RANGE | Self::UP,
            PointerPhase::Leave | PointerPhase::CaptureLost | PointerPhase::Wheel { .. } => {
                Self::NONE
            }
        };
        if sample.flags.in_contact {
            flags = flags | Self::IN_CONTACT | Self::FIRST_BUTTON;
        }
        if sample.flags.primary {
            flags = flags | Self::PRIMARY;
        }
        if sample.flags.confidence {
            flags = flags | Self::CONFIDENCE;
        }
        if sample.flags.canceled || sample.phase == PointerPhase::CaptureLost {
            flags = flags | Self::CANCELED;
        }
        flags
    }
}

impl std::ops::BitOr for ContactFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Fully specified pointer event, ready to hand to the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedPointer {
    pub kind: PointerKind,
    pub pointer_id: u32,
    pub event: PointerEventKind,
    /// Location in control client coordinates.
    pub location: Point,
    pub screen: Point,
    pub flags: ContactFlags,
    pub pressure: Option<u32>,
}

impl InjectedPointer {
    /// Converts a forwarded sample whose position is already in control space.
    pub fn from_sample(sample: &PointerSample, location: Point) -> anyhow::Result<Self> {
        PointerInfoBuilder::from_sample(sample, location)?.build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointerInfoBuilder {
    kind: Option<PointerKind>,
    pointer_id: Option<u32>,
    event: Option<PointerEventKind>,
    location: Option<(Point, Point)>,
    flags: Option<ContactFlags>,
    pressure: Option<u32>,
}

impl PointerInfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded from a sample, for completion on another thread.
    pub fn from_sample(sample: &PointerSample, location: Point) -> anyhow::Result<Self> {
        let event = PointerEventKind::from_phase(sample.phase)
            .ok_or_else(|| anyhow!("{:?} has no pointer-injection equivalent", sample.phase))?;
        let builder = Self::new()
            .kind(sample.kind)
            .pointer_id(sample.id)
            .event(event)
            .location(location, sample.screen)
            .flags(ContactFlags::from_sample(sample));
        Ok(match sample.pressure {
            Some(pressure) => builder.pressure(pressure),
            None => builder,
        })
    }

    pub fn kind(mut self, kind: PointerKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn pointer_id(mut self, id: u32) -> Self {
        self.pointer_id = Some(id);
        self
    }

    pub fn event(mut self, event: PointerEventKind) -> Self {
        self.event = Some(event);
        self
    }

    pub fn location(mut self, client: Point, screen: Point) -> Self {
        self.location = Some((client, screen));
        self
    }

    pub fn flags(mut self, flags: ContactFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn pressure(mut self, pressure: u32) -> Self {
        self.pressure = Some(pressure.min(PEN_PRESSURE_MAX));
        self
    }

    pub fn build(self) -> anyhow::Result<InjectedPointer> {
        let mut missing = Vec::new();
        if self.kind.is_none() {
            missing.push("kind");
        }
        if self.pointer_id.is_none() {
            missing.push("pointer id");
        }
        if self.event.is_none() {
            missing.push("event kind");
        }
        if self.location.is_none() {
            missing.push("location");
        }
        if self.flags.is_none() {
            missing.push("contact flags");
        }
        let (Some(kind), Some(pointer_id), Some(event), Some((location, screen)), Some(flags)) =
            (self.kind, self.pointer_id, self.event, self.location, self.flags)
        else {
            bail!("pointer info incomplete, missing {}", missing.join(", "));
        };
        if !matches!(kind, PointerKind::Pen | PointerKind::Touch) {
            bail!("pointer injection supports pen and touch only, got {kind:?}");
        }
        Ok(InjectedPointer {
            kind,
            pointer_id,
            event,
            location,
            screen,
            flags,
            pressure: self.pressure,
        })
    }
}

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Receiving end, owned by the UI thread.
pub struct InjectionBridge {
    tx: Sender<InjectedPointer>,
    rx: Receiver<InjectedPointer>,
    waker: Option<Waker>,
}

/// Sending end, cloned into worker threads.
#[derive(Clone)]
pub struct InjectionSender {
    tx: Sender<InjectedPointer>,
    waker: Option<Waker>,
}

impl InjectionBridge {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            waker: None,
        }
    }

    /// Called after every send, typically to post a message to the UI thread.
    pub fn with_waker<F>(mut self, waker: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.waker = Some(Arc::new(waker));
        self
    }

    pub fn sender(&self) -> InjectionSender {
        InjectionSender {
            tx: self.tx.clone(),
            waker: self.waker.clone(),
        }
    }

    /// Hands every queued pointer to `submit` and returns how many there were.
    pub fn drain<F>(&self, mut submit: F) -> usize
    where
        F: FnMut(InjectedPointer),
    {
        let mut count = 0;
        loop {
            match self.rx.try_recv() {
                Ok(pointer) => {
                    submit(pointer);
                    count += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        count
    }
}

impl Default for InjectionBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectionSender {
    pub fn send(&self, pointer: InjectedPointer) -> anyhow::Result<()> {
        self.tx
            .send(pointer)
            .map_err(|_| anyhow!("injection bridge closed"))?;
        if let Some(waker) = &self.waker {
            waker();
        }
        Ok(())
    }
}

/// Builds a pointer on a short-lived worker thread and posts it over the
/// bridge.
pub fn spawn_pointer_worker(
    sender: InjectionSender,
    builder: PointerInfoBuilder,
) -> anyhow::Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("pointer-injection".into())
        .spawn(move || match builder.build() {
            Ok(pointer) => {
                if let Err(e) = sender.send(pointer) {
                    tracing::warn!(error = %e, "failed to post injected pointer");
                }
            }
            Err(e) => tracing::warn!(error = %e, "pointer worker could not build pointer info"),
        })?;
    Ok(handle)
}
