//! AuthorizationSetup: offers EIM and, when configured, PnC with a challenge

use super::{pull, respond_checked, session_stop, unexpected, Authorization, EventKind, Transition};
use crate::config::SessionConfig;
use crate::context::Context;
use crate::message::{
    self, AuthorizationMode, AuthorizationSetupRequest, AuthorizationSetupResponse, Request,
    ResponseCode,
};
use crate::session::Session;

/// Offer the configured authorization services.
///
/// `gen_challenge` is only set when PnC is offered.
pub fn handle_request(
    req: &AuthorizationSetupRequest,
    session: &Session,
    config: &SessionConfig,
    gen_challenge: Option<Vec<u8>>,
) -> AuthorizationSetupResponse {
    let mut res = AuthorizationSetupResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    res.authorization_services = config.authorization_services.clone();
    res.certificate_installation_service = config.cert_install_service;
    res.authorization_mode = match gen_challenge {
        Some(gen_challenge) => AuthorizationMode::Pnc { gen_challenge },
        None => AuthorizationMode::Eim,
    };
    res.response_code = ResponseCode::Ok;
    res
}

#[derive(Debug, Default)]
pub struct AuthorizationSetup;

impl AuthorizationSetup {
    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "AuthorizationSetup") else {
            return Transition::Stay;
        };

        match request {
            Request::AuthorizationSetup(req) => {
                let pnc_offered = ctx
                    .session_config
                    .authorization_services
                    .contains(&message::Authorization::Pnc);
                let gen_challenge = pnc_offered.then(|| ctx.generate_challenge());

                let res = handle_request(&req, &ctx.session, &ctx.session_config, gen_challenge.clone());
                if !respond_checked(ctx, res) {
                    return Transition::Stay;
                }
                Transition::to(Authorization::new(gen_challenge))
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "AuthorizationSetup", ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvseSetupConfig;
    use crate::context::testing::*;
    use crate::state::{Event, State};

    #[test]
    fn test_eim_offered() {
        let (mut ctx, _rx) = context_with_session();
        let mut state = State::AuthorizationSetup(AuthorizationSetup);

        let req = AuthorizationSetupRequest { header: header(&ctx) };
        let transition = state.feed(Event::Message(Request::AuthorizationSetup(req)), &mut ctx);

        assert!(matches!(transition, Transition::To(State::Authorization(_))));
        let Some(message::Response::AuthorizationSetup(res)) = ctx.take_response() else {
            panic!("expected AuthorizationSetupRes");
        };
        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.authorization_services, vec![message::Authorization::Eim]);
        assert_eq!(res.authorization_mode, AuthorizationMode::Eim);
    }

    #[test]
    fn test_pnc_offered_with_challenge() {
        let (mut ctx, _rx) = context_with_session();
        ctx.session_config = SessionConfig::new(
            &EvseSetupConfig::default().with_authorization_services(vec![
                message::Authorization::Eim,
                message::Authorization::Pnc,
            ]),
        );

        let req = AuthorizationSetupRequest { header: header(&ctx) };
        let mut state = State::AuthorizationSetup(AuthorizationSetup);
        state.feed(Event::Message(Request::AuthorizationSetup(req)), &mut ctx);

        let Some(message::Response::AuthorizationSetup(res)) = ctx.take_response() else {
            panic!("expected AuthorizationSetupRes");
        };
        match res.authorization_mode {
            AuthorizationMode::Pnc { gen_challenge } => assert_eq!(gen_challenge.len(), 16),
            AuthorizationMode::Eim => panic!("expected PnC mode"),
        }
    }

    #[test]
    fn test_unknown_session() {
        let (ctx, _rx) = context_with_session();
        let req = AuthorizationSetupRequest::default();

        let res = handle_request(&req, &ctx.session, &ctx.session_config, None);
        assert_eq!(res.response_code, ResponseCode::FailedUnknownSession);
    }
}
