//! The state machine's window onto the outside world
//!
//! Owned by the driver and lent to the active state for one `feed` call:
//! - current request (`pull_request`) and control event (`get_control_event`)
//! - the single response slot (`respond`)
//! - feedback sink, session, session config and pause context
//! - the stop/pause flags the driver acts on

use tracing::{debug, error};

use crate::config::SessionConfig;
use crate::control::{ControlEvent, ControlPayload, UpdateDynamicModeParameters};
use crate::feedback::Feedback;
use crate::message::{Request, Response, SessionId};
use crate::session::{RandomIdGenerator, SelectedServiceParameters, Session, SessionIdGenerator};

/// What survives a paused session until the EV rejoins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PauseContext {
    pub old_session_id: Option<SessionId>,
    pub selected_service_parameters: Option<SelectedServiceParameters>,
}

pub struct Context {
    pub feedback: Box<dyn Feedback>,
    pub session: Session,
    pub session_config: SessionConfig,
    pub pause_ctx: Option<PauseContext>,
    /// Session ended; the driver tears the connection down
    pub session_stopped: bool,
    /// Session parked; selected services are kept in `pause_ctx`
    pub session_paused: bool,
    /// Contactor failure reported by the charger or detected by timeout
    pub contactor_fault: bool,
    pub cache_dynamic_mode_parameters: Option<UpdateDynamicModeParameters>,
    id_generator: Box<dyn SessionIdGenerator>,
    request: Option<Request>,
    response: Option<Response>,
    control_event: Option<ControlEvent>,
}

impl Context {
    pub fn new(session_config: SessionConfig, feedback: Box<dyn Feedback>) -> Self {
        Self {
            feedback,
            session: Session::with_id(SessionId::default()),
            session_config,
            pause_ctx: None,
            session_stopped: false,
            session_paused: false,
            contactor_fault: false,
            cache_dynamic_mode_parameters: None,
            id_generator: Box::new(RandomIdGenerator),
            request: None,
            response: None,
            control_event: None,
        }
    }

    pub fn with_id_generator(mut self, generator: Box<dyn SessionIdGenerator>) -> Self {
        self.id_generator = generator;
        self
    }

    pub fn with_pause_context(mut self, pause_ctx: PauseContext) -> Self {
        self.pause_ctx = Some(pause_ctx);
        self
    }

    /// Replace the session with a fresh one
    pub fn start_new_session(&mut self) -> &Session {
        self.session = Session::with_generator(self.id_generator.as_mut());
        &self.session
    }

    pub fn generate_challenge(&mut self) -> Vec<u8> {
        self.id_generator.challenge()
    }

    pub(crate) fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }

    /// Take the request of the current message event
    pub fn pull_request(&mut self) -> Option<Request> {
        self.request.take()
    }

    /// Hand a response to the codec/transport boundary
    pub fn respond(&mut self, response: impl Into<Response>) {
        let response = response.into();
        debug!(
            "Responding {} ({})",
            response.message_type(),
            response.response_code()
        );
        self.feedback.response_code(response.response_code());

        if let Some(previous) = self.response.replace(response) {
            error!(
                "Response {} was never sent and got replaced",
                previous.message_type()
            );
        }
    }

    /// Take the pending response for sending
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    pub(crate) fn set_control_event(&mut self, event: ControlEvent) {
        self.control_event = Some(event);
    }

    pub(crate) fn clear_control_event(&mut self) {
        self.control_event = None;
    }

    /// Current control event as payload `T`, `None` if it is something else
    pub fn get_control_event<T: ControlPayload>(&self) -> Option<T> {
        self.control_event.as_ref().and_then(T::from_event)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("session", &self.session)
            .field("pause_ctx", &self.pause_ctx)
            .field("session_stopped", &self.session_stopped)
            .field("session_paused", &self.session_paused)
            .field("contactor_fault", &self.contactor_fault)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers shared by the state tests

    use super::*;
    use crate::feedback::{ChannelFeedback, FeedbackEvent};
    use crate::message::Header;
    use crate::session::SequentialIdGenerator;
    use tokio::sync::mpsc;

    pub fn context() -> (Context, mpsc::UnboundedReceiver<FeedbackEvent>) {
        let (feedback, rx) = ChannelFeedback::new();
        let ctx = Context::new(SessionConfig::default(), Box::new(feedback))
            .with_id_generator(Box::new(SequentialIdGenerator::new(1)));
        (ctx, rx)
    }

    /// Context with an established session
    pub fn context_with_session() -> (Context, mpsc::UnboundedReceiver<FeedbackEvent>) {
        let (mut ctx, rx) = context();
        ctx.start_new_session();
        (ctx, rx)
    }

    pub fn header(ctx: &Context) -> Header {
        ctx.session.header()
    }

    pub fn drain(rx: &mut mpsc::UnboundedReceiver<FeedbackEvent>) -> Vec<FeedbackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }
}
