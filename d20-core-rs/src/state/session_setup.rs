//! SessionSetup
//!
//! First request of a connection. An EV presenting the id of a paused
//! session is joined to it; anything else gets a fresh session id.

use tracing::info;

use super::{pull, unexpected, AuthorizationSetup, EventKind, Transition};
use crate::context::{Context, PauseContext};
use crate::message::{Request, ResponseCode, SessionSetupRequest, SessionSetupResponse};
use crate::session::Session;

pub const SELECTED_PROTOCOL: &str = "urn:iso:std:iso:15118:-20:DC";

pub fn handle_request(
    _req: &SessionSetupRequest,
    session: &Session,
    evse_id: &str,
    new_session: bool,
) -> SessionSetupResponse {
    SessionSetupResponse {
        header: session.header(),
        response_code: if new_session {
            ResponseCode::OkNewSessionEstablished
        } else {
            ResponseCode::OkOldSessionJoined
        },
        evseid: evse_id.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct SessionSetup;

impl SessionSetup {
    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "SessionSetup") else {
            return Transition::Stay;
        };

        let req = match request {
            Request::SessionSetup(req) => req,
            other => return unexpected(&other, "SessionSetup", ctx),
        };

        ctx.feedback.selected_protocol(SELECTED_PROTOCOL);
        ctx.feedback.evcc_id(&req.evccid);

        let paused = match &ctx.pause_ctx {
            Some(PauseContext {
                old_session_id: Some(id),
                selected_service_parameters: Some(selected),
            }) if *id == req.header.session_id => Some((*id, *selected)),
            _ => None,
        };

        let new_session = match paused {
            Some((id, selected)) => {
                info!("Resuming paused session {}", id);
                ctx.session = Session::resume(id, selected);
                false
            }
            None => {
                let id = *ctx.start_new_session().id();
                info!("New session {} for EVCC {}", id, req.evccid);
                true
            }
        };

        let res = handle_request(&req, &ctx.session, &ctx.session_config.evse_id, new_session);
        ctx.respond(res);

        Transition::to(AuthorizationSetup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use crate::feedback::FeedbackEvent;
    use crate::message::{Header, SessionId};
    use crate::session::SelectedServiceParameters;
    use crate::state::{Event, State};

    fn setup_request(session_id: SessionId) -> Request {
        Request::SessionSetup(SessionSetupRequest {
            header: Header {
                session_id,
                timestamp: 0,
            },
            evccid: "WMIV1234567890ABCDEX".to_string(),
        })
    }

    #[test]
    fn test_new_session_established() {
        let (mut ctx, mut rx) = context();
        let mut state = State::initial();

        let transition = state.feed(Event::Message(setup_request(SessionId::default())), &mut ctx);

        assert!(matches!(transition, Transition::To(State::AuthorizationSetup(_))));
        let res = ctx.take_response().unwrap();
        assert_eq!(res.response_code(), ResponseCode::OkNewSessionEstablished);
        assert_eq!(ctx.session.id(), &SessionId([0, 0, 0, 0, 0, 0, 0, 1]));
        assert!(!ctx.session_stopped);

        let events = drain(&mut rx);
        assert!(events.contains(&FeedbackEvent::EvccId("WMIV1234567890ABCDEX".to_string())));
        assert!(events.contains(&FeedbackEvent::SelectedProtocol(SELECTED_PROTOCOL.to_string())));
    }

    #[test]
    fn test_old_session_joined() {
        let (ctx, _rx) = context();
        let old_id = SessionId([9; 8]);
        let selected = SelectedServiceParameters::default();
        let mut ctx = ctx.with_pause_context(PauseContext {
            old_session_id: Some(old_id),
            selected_service_parameters: Some(selected),
        });

        let mut state = State::initial();
        state.feed(Event::Message(setup_request(old_id)), &mut ctx);

        let res = ctx.take_response().unwrap();
        assert_eq!(res.response_code(), ResponseCode::OkOldSessionJoined);
        assert_eq!(ctx.session.id(), &old_id);
        assert!(ctx.session.is_resumed());
    }

    #[test]
    fn test_unknown_old_session_gets_new_one() {
        let (ctx, _rx) = context();
        let mut ctx = ctx.with_pause_context(PauseContext {
            old_session_id: Some(SessionId([9; 8])),
            selected_service_parameters: Some(SelectedServiceParameters::default()),
        });

        let mut state = State::initial();
        state.feed(Event::Message(setup_request(SessionId([7; 8]))), &mut ctx);

        let res = ctx.take_response().unwrap();
        assert_eq!(res.response_code(), ResponseCode::OkNewSessionEstablished);
        assert_ne!(ctx.session.id(), &SessionId([7; 8]));
    }

    #[test]
    fn test_session_stop_before_setup_is_sequence_error() {
        let (mut ctx, _rx) = context();
        let mut state = State::initial();

        state.feed(Event::Message(Request::SessionStop(Default::default())), &mut ctx);

        assert!(ctx.session_stopped);
        assert_eq!(
            ctx.take_response().unwrap().response_code(),
            ResponseCode::FailedSequenceError
        );
    }
}
