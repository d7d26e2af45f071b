//! Two-stage asynchronous creation of the browser control.
//!
//! The platform issues the requests this machine asks for and feeds the
//! completion callbacks back in as [`InitEvent`]s. Nothing is retried.

use super::BrowserControl;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Environment,
    Controller,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("browser environment"),
            Self::Controller => f.write_str("browser controller"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitState {
    #[default]
    Uninitialized,
    EnvironmentPending,
    /// The environment exists and the controller has been requested from it.
    EnvironmentReady,
    ControllerReady,
    Failed(InitStage),
}

impl InitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ControllerReady | Self::Failed(_))
    }
}

pub enum InitEvent<E> {
    Start,
    EnvironmentCreated(anyhow::Result<E>),
    ControllerCreated(anyhow::Result<Box<dyn BrowserControl>>),
}

pub enum InitStep<E> {
    Nothing,
    RequestEnvironment,
    RequestController(E),
    Ready(Box<dyn BrowserControl>),
    Failed { stage: InitStage, error: anyhow::Error },
}

impl<E> fmt::Debug for InitStep<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("Nothing"),
            Self::RequestEnvironment => f.write_str("RequestEnvironment"),
            Self::RequestController(_) => f.write_str("RequestController(..)"),
            Self::Ready(_) => f.write_str("Ready(..)"),
            Self::Failed { stage, error } => write!(f, "Failed({stage}: {error:#})"),
        }
    }
}

#[derive(Debug, Default)]
pub struct BrowserInit {
    state: InitState,
}

impl BrowserInit {
    pub fn state(&self) -> InitState {
        self.state
    }

    pub fn advance<E>(&mut self, event: InitEvent<E>) -> InitStep<E> {
        match (self.state, event) {
            (InitState::Uninitialized, InitEvent::Start) => {
                self.state = InitState::EnvironmentPending;
                InitStep::RequestEnvironment
            }
            (_, InitEvent::Start) => {
                tracing::debug!(state = ?self.state, "browser init already started");
                InitStep::Nothing
            }
            (InitState::EnvironmentPending, InitEvent::EnvironmentCreated(Ok(env))) => {
                tracing::info!("browser environment ready");
                self.state = InitState::EnvironmentReady;
                InitStep::RequestController(env)
            }
            (InitState::EnvironmentPending, InitEvent::EnvironmentCreated(Err(error))) => {
                self.fail(InitStage::Environment, error)
            }
            (InitState::EnvironmentReady, InitEvent::ControllerCreated(Ok(control))) => {
                tracing::info!("browser controller ready");
                self.state = InitState::ControllerReady;
                InitStep::Ready(control)
            }
            (InitState::EnvironmentReady, InitEvent::ControllerCreated(Err(error))) => {
                self.fail(InitStage::Controller, error)
            }
            (state, _) => {
                tracing::warn!(?state, "unexpected browser init completion ignored");
                InitStep::Nothing
            }
        }
    }

    fn fail<E>(&mut self, stage: InitStage, error: anyhow::Error) -> InitStep<E> {
        tracing::error!(%stage, error = %format!("{error:#}"), "browser initialization failed");
        self.state = InitState::Failed(stage);
        InitStep::Failed { stage, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::injection::InjectedPointer;
    use crate::browser::{ContentSource, SyntheticMouseEvent};
    use crate::ink::geometry::ClientRect;
    use anyhow::anyhow;

    struct NullControl;

    impl BrowserControl for NullControl {
        fn set_bounds(&mut self, _bounds: ClientRect) -> anyhow::Result<()> {
            Ok(())
        }
        fn set_visible(&mut self, _visible: bool) -> anyhow::Result<()> {
            Ok(())
        }
        fn navigate(&mut self, _content: &ContentSource) -> anyhow::Result<()> {
            Ok(())
        }
        fn send_mouse_input(&mut self, _event: &SyntheticMouseEvent) -> anyhow::Result<()> {
            Ok(())
        }
        fn send_pointer_input(&mut self, _pointer: InjectedPointer) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn happy_path_requests_each_stage_once() {
        let mut init = BrowserInit::default();
        assert!(matches!(
            init.advance::<u32>(InitEvent::Start),
            InitStep::RequestEnvironment
        ));
        assert_eq!(init.state(), InitState::EnvironmentPending);

        assert!(matches!(
            init.advance(InitEvent::EnvironmentCreated(Ok(7u32))),
            InitStep::RequestController(7)
        ));
        assert_eq!(init.state(), InitState::EnvironmentReady);

        let step = init.advance::<u32>(InitEvent::ControllerCreated(Ok(Box::new(NullControl))));
        assert!(matches!(step, InitStep::Ready(_)));
        assert_eq!(init.state(), InitState::ControllerReady);
        assert!(init.state().is_terminal());
    }

    #[test]
    fn second_start_is_a_no_op() {
        let mut init = BrowserInit::default();
        init.advance::<()>(InitEvent::Start);
        assert!(matches!(init.advance::<()>(InitEvent::Start), InitStep::Nothing));
        assert_eq!(init.state(), InitState::EnvironmentPending);
    }

    #[test]
    fn environment_failure_is_terminal() {
        let mut init = BrowserInit::default();
        init.advance::<()>(InitEvent::Start);
        let step = init.advance::<()>(InitEvent::EnvironmentCreated(Err(anyhow!("no runtime"))));
        assert!(matches!(
            step,
            InitStep::Failed {
                stage: InitStage::Environment,
                ..
            }
        ));
        assert_eq!(init.state(), InitState::Failed(InitStage::Environment));
        assert!(matches!(init.advance::<()>(InitEvent::Start), InitStep::Nothing));
    }

    #[test]
    fn controller_failure_is_reported_with_stage() {
        let mut init = BrowserInit::default();
        init.advance::<()>(InitEvent::Start);
        init.advance(InitEvent::EnvironmentCreated(Ok(())));
        let step = init.advance::<()>(InitEvent::ControllerCreated(Err(anyhow!("denied"))));
        match step {
            InitStep::Failed { stage, error } => {
                assert_eq!(stage, InitStage::Controller);
                assert_eq!(error.to_string(), "denied");
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn out_of_order_completion_is_ignored() {
        let mut init = BrowserInit::default();
        let step = init.advance::<()>(InitEvent::ControllerCreated(Ok(Box::new(NullControl))));
        assert!(matches!(step, InitStep::Nothing));
        assert_eq!(init.state(), InitState::Uninitialized);
    }
}
