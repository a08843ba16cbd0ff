//! Authorization
//!
//! EIM stays `Ongoing` until the charger authorizes. PnC only checks that
//! the EV echoes the challenge sent in AuthorizationSetup.

use tracing::{info, warn};

use super::{
    pull, respond_checked, session_stop, unexpected, DcChargeParameterDiscovery, EventKind,
    ServiceDiscovery, Transition,
};
use crate::context::Context;
use crate::control::AuthorizationStatus;
use crate::feedback::Signal;
use crate::message::{
    self, AuthorizationRequest, AuthorizationResponse, Processing, Request, ResponseCode,
};
use crate::session::Session;

/// Authorization outcome as reported by the charge controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

pub fn handle_request(
    req: &AuthorizationRequest,
    session: &Session,
    offered: &[message::Authorization],
    gen_challenge: Option<&[u8]>,
    status: AuthStatus,
) -> AuthorizationResponse {
    let mut res = AuthorizationResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    res.evse_processing = Processing::Finished;

    let selected = req.selected_authorization_service;
    if !offered.contains(&selected) {
        res.response_code = ResponseCode::WarningAuthorizationSelectionInvalid;
        return res;
    }

    if selected == message::Authorization::Pnc {
        let challenge_ok = matches!(
            (gen_challenge, req.gen_challenge.as_deref()),
            (Some(expected), Some(received)) if expected == received
        );
        if !challenge_ok {
            res.response_code = ResponseCode::WarningChallengeInvalid;
            return res;
        }
    }

    match status {
        AuthStatus::Pending => {
            res.evse_processing = Processing::Ongoing;
            res.response_code = ResponseCode::Ok;
        }
        AuthStatus::Accepted => res.response_code = ResponseCode::Ok,
        AuthStatus::Rejected => {
            res.response_code = match selected {
                message::Authorization::Eim => ResponseCode::WarningEimAuthorizationFailure,
                message::Authorization::Pnc => ResponseCode::WarningGeneralPncAuthorizationError,
            };
        }
    }
    res
}

#[derive(Debug, Default)]
pub struct Authorization {
    gen_challenge: Option<Vec<u8>>,
    status: AuthStatus,
    auth_requested: bool,
}

impl Authorization {
    pub fn new(gen_challenge: Option<Vec<u8>>) -> Self {
        Self {
            gen_challenge,
            ..Default::default()
        }
    }

    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            if let Some(AuthorizationStatus { authorized }) = ctx.get_control_event::<AuthorizationStatus>() {
                info!("Authorization {}", if authorized { "accepted" } else { "rejected" });
                self.status = if authorized {
                    AuthStatus::Accepted
                } else {
                    AuthStatus::Rejected
                };
            }
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "Authorization") else {
            return Transition::Stay;
        };

        match request {
            Request::Authorization(req) => {
                let res = handle_request(
                    &req,
                    &ctx.session,
                    &ctx.session_config.authorization_services,
                    self.gen_challenge.as_deref(),
                    self.status,
                );

                if res.response_code == ResponseCode::Ok
                    && res.evse_processing == Processing::Ongoing
                    && !self.auth_requested
                {
                    if req.selected_authorization_service == message::Authorization::Eim {
                        ctx.feedback.signal(Signal::RequireAuthEim);
                    }
                    self.auth_requested = true;
                }

                let accepted = res.response_code == ResponseCode::Ok
                    && res.evse_processing == Processing::Finished;
                if res.response_code.is_warning() {
                    warn!("Authorization answered with {}", res.response_code);
                }

                if !respond_checked(ctx, res) || !accepted {
                    return Transition::Stay;
                }

                if ctx.session.is_resumed() {
                    Transition::to(DcChargeParameterDiscovery)
                } else {
                    Transition::to(ServiceDiscovery)
                }
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "Authorization", ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use crate::context::PauseContext;
    use crate::control::ControlEvent;
    use crate::feedback::FeedbackEvent;
    use crate::session::SelectedServiceParameters;
    use crate::state::{Event, State};

    fn eim_request(ctx: &Context) -> Event {
        Event::Message(Request::Authorization(AuthorizationRequest {
            header: header(ctx),
            selected_authorization_service: message::Authorization::Eim,
            gen_challenge: None,
        }))
    }

    fn processing(ctx: &mut Context) -> (ResponseCode, Processing) {
        match ctx.take_response() {
            Some(message::Response::Authorization(res)) => (res.response_code, res.evse_processing),
            other => panic!("expected AuthorizationRes, got {:?}", other),
        }
    }

    #[test]
    fn test_eim_pending_until_authorized() {
        let (mut ctx, mut rx) = context_with_session();
        let mut state = State::Authorization(Authorization::new(None));

        assert!(state.feed(eim_request(&ctx), &mut ctx).is_stay());
        assert_eq!(processing(&mut ctx), (ResponseCode::Ok, Processing::Ongoing));

        assert!(state.feed(eim_request(&ctx), &mut ctx).is_stay());
        assert_eq!(processing(&mut ctx), (ResponseCode::Ok, Processing::Ongoing));

        let signals: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, FeedbackEvent::Signal(_)))
            .collect();
        assert_eq!(signals, vec![FeedbackEvent::Signal(Signal::RequireAuthEim)]);

        state.feed(
            Event::Control(ControlEvent::Authorization(AuthorizationStatus { authorized: true })),
            &mut ctx,
        );
        let transition = state.feed(eim_request(&ctx), &mut ctx);

        assert_eq!(processing(&mut ctx), (ResponseCode::Ok, Processing::Finished));
        assert!(matches!(transition, Transition::To(State::ServiceDiscovery(_))));
    }

    #[test]
    fn test_eim_rejected() {
        let (mut ctx, _rx) = context_with_session();
        let mut state = State::Authorization(Authorization::new(None));

        state.feed(
            Event::Control(ControlEvent::Authorization(AuthorizationStatus { authorized: false })),
            &mut ctx,
        );
        let transition = state.feed(eim_request(&ctx), &mut ctx);

        assert!(transition.is_stay());
        assert_eq!(
            processing(&mut ctx),
            (ResponseCode::WarningEimAuthorizationFailure, Processing::Finished)
        );
        assert!(!ctx.session_stopped);
    }

    #[test]
    fn test_pnc_not_offered() {
        let (ctx, _rx) = context_with_session();
        let req = AuthorizationRequest {
            header: header(&ctx),
            selected_authorization_service: message::Authorization::Pnc,
            gen_challenge: Some(vec![0; 16]),
        };

        let res = handle_request(
            &req,
            &ctx.session,
            &[message::Authorization::Eim],
            None,
            AuthStatus::Accepted,
        );
        assert_eq!(res.response_code, ResponseCode::WarningAuthorizationSelectionInvalid);
    }

    #[test]
    fn test_pnc_challenge_mismatch() {
        let (ctx, _rx) = context_with_session();
        let offered = [message::Authorization::Eim, message::Authorization::Pnc];
        let req = AuthorizationRequest {
            header: header(&ctx),
            selected_authorization_service: message::Authorization::Pnc,
            gen_challenge: Some(vec![1; 16]),
        };

        let res = handle_request(&req, &ctx.session, &offered, Some(&[2; 16]), AuthStatus::Accepted);
        assert_eq!(res.response_code, ResponseCode::WarningChallengeInvalid);

        let res = handle_request(&req, &ctx.session, &offered, Some(&[1; 16]), AuthStatus::Accepted);
        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.evse_processing, Processing::Finished);
    }

    #[test]
    fn test_resumed_session_skips_service_negotiation() {
        let (ctx, _rx) = context();
        let mut ctx = ctx.with_pause_context(PauseContext::default());
        ctx.session = Session::resume(
            message::SessionId([3; 8]),
            SelectedServiceParameters::default(),
        );

        let mut state = State::Authorization(Authorization::new(None));
        state.feed(
            Event::Control(ControlEvent::Authorization(AuthorizationStatus { authorized: true })),
            &mut ctx,
        );
        let transition = state.feed(eim_request(&ctx), &mut ctx);

        assert!(matches!(
            transition,
            Transition::To(State::DcChargeParameterDiscovery(_))
        ));
    }

    #[test]
    fn test_unknown_session() {
        let (ctx, _rx) = context_with_session();
        let req = AuthorizationRequest::default();
        let res = handle_request(
            &req,
            &ctx.session,
            &[message::Authorization::Eim],
            None,
            AuthStatus::Accepted,
        );
        assert_eq!(res.response_code, ResponseCode::FailedUnknownSession);
    }
}
