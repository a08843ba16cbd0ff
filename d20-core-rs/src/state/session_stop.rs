//! SessionStop
//!
//! Terminate ends the session. Pause keeps the selected service parameters
//! so a later SessionSetup can rejoin with the same session id.

use tracing::{error, info};

use super::{pull, respond_checked, unexpected, EventKind, ServiceDiscovery, Transition};
use crate::context::Context;
use crate::feedback::Signal;
use crate::message::{
    ChargingSession, Request, ResponseCode, SessionStopRequest, SessionStopResponse,
};
use crate::session::Session;

pub fn handle_request(req: &SessionStopRequest, session: &Session) -> SessionStopResponse {
    let mut res = SessionStopResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    if req.charging_session == ChargingSession::ServiceRenegotiation
        && !session.service_renegotiation_supported()
    {
        res.response_code = ResponseCode::FailedNoServiceRenegotiationSupported;
        return res;
    }

    res.response_code = ResponseCode::Ok;
    res
}

/// Handle SessionStopReq from whichever state is active
pub(crate) fn handle_session_stop(req: &SessionStopRequest, ctx: &mut Context) -> Transition {
    let res = handle_request(req, &ctx.session);
    let ok = respond_checked(ctx, res);

    if req.ev_termination_code.is_some() || req.ev_termination_explanation.is_some() {
        let code = req.ev_termination_code.as_deref().unwrap_or_default();
        let explanation = req.ev_termination_explanation.as_deref().unwrap_or_default();
        info!("EV termination: {} ({})", code, explanation);
        ctx.feedback.ev_termination(code, explanation);
    }

    if !ok {
        return Transition::Stay;
    }

    match req.charging_session {
        ChargingSession::Terminate => {
            info!("Session {} terminated by EV", ctx.session.id());
            ctx.session_stopped = true;
            ctx.pause_ctx = None;
            ctx.feedback.signal(Signal::DlinkTerminate);
            Transition::to(SessionStop)
        }
        ChargingSession::Pause => {
            let id = *ctx.session.id();
            let selected = *ctx.session.selected_services();
            match ctx.pause_ctx.as_mut() {
                Some(pause_ctx) => {
                    pause_ctx.old_session_id = Some(id);
                    pause_ctx.selected_service_parameters = Some(selected);
                    info!("Session {} paused", id);
                }
                None => error!("Session {} paused without a pause context, resume will fail", id),
            }
            ctx.session_paused = true;
            ctx.feedback.signal(Signal::DlinkPause);
            Transition::to(SessionStop)
        }
        ChargingSession::ServiceRenegotiation => {
            info!("Service renegotiation in session {}", ctx.session.id());
            Transition::to(ServiceDiscovery)
        }
    }
}

/// Terminal state after SessionStopRes
#[derive(Debug, Default)]
pub struct SessionStop;

impl SessionStop {
    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "SessionStop") else {
            return Transition::Stay;
        };

        match request {
            Request::SessionStop(req) => handle_session_stop(&req, ctx),
            other => unexpected(&other, "SessionStop", ctx),
        }
    }
}
