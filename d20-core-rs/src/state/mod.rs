//! ISO 15118-20 DC state machine
//!
//! One [`State`] variant per protocol phase. The driver calls
//! [`State::feed`] with one [`Event`] at a time and swaps in the returned
//! state, calling [`State::enter`] before the next event.
//!
//! Every state:
//! - ignores control events it has no use for
//! - validates the session id of every expected request
//! - answers `SessionStopReq` (once a session exists)
//! - answers anything else with a sequence error and stops the session

pub mod authorization;
pub mod authorization_setup;
pub mod dc_cable_check;
pub mod dc_charge_loop;
pub mod dc_charge_parameter_discovery;
pub mod dc_pre_charge;
pub mod dc_welding_detection;
pub mod power_delivery;
pub mod schedule_exchange;
pub mod service_detail;
pub mod service_discovery;
pub mod service_selection;
pub mod session_setup;
pub mod session_stop;

use tracing::{error, info, warn};

use crate::context::Context;
use crate::control::{ControlEvent, UpdateDynamicModeParameters};
use crate::message::{MessageType, Request, Response, ResponseCode};

pub use authorization::Authorization;
pub use authorization_setup::AuthorizationSetup;
pub use dc_cable_check::DcCableCheck;
pub use dc_charge_loop::DcChargeLoop;
pub use dc_charge_parameter_discovery::DcChargeParameterDiscovery;
pub use dc_pre_charge::DcPreCharge;
pub use dc_welding_detection::DcWeldingDetection;
pub use power_delivery::PowerDelivery;
pub use schedule_exchange::ScheduleExchange;
pub use service_detail::ServiceDetail;
pub use service_discovery::ServiceDiscovery;
pub use session_setup::SessionSetup;
pub use session_stop::SessionStop;

/// Input to a state
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Decoded request from the EV
    Message(Request),
    /// Out-of-band input from the charge controller
    Control(ControlEvent),
}

/// What a state sees of an event; payloads are read through the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ControlMessage,
    V2gtpMessage,
}

/// Result of feeding an event
#[derive(Debug)]
pub enum Transition {
    Stay,
    To(State),
}

impl Transition {
    pub fn to(state: impl Into<State>) -> Self {
        Transition::To(state.into())
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, Transition::Stay)
    }
}

#[derive(Debug)]
pub enum State {
    SessionSetup(SessionSetup),
    AuthorizationSetup(AuthorizationSetup),
    Authorization(Authorization),
    ServiceDiscovery(ServiceDiscovery),
    ServiceDetail(ServiceDetail),
    DcChargeParameterDiscovery(DcChargeParameterDiscovery),
    ScheduleExchange(ScheduleExchange),
    DcCableCheck(DcCableCheck),
    DcPreCharge(DcPreCharge),
    PowerDelivery(PowerDelivery),
    DcChargeLoop(DcChargeLoop),
    DcWeldingDetection(DcWeldingDetection),
    SessionStop(SessionStop),
    /// Terminal state after a fatal timeout
    Failed,
}

impl State {
    pub fn initial() -> Self {
        State::SessionSetup(SessionSetup)
    }

    pub fn name(&self) -> &'static str {
        match self {
            State::SessionSetup(_) => "SessionSetup",
            State::AuthorizationSetup(_) => "AuthorizationSetup",
            State::Authorization(_) => "Authorization",
            State::ServiceDiscovery(_) => "ServiceDiscovery",
            State::ServiceDetail(_) => "ServiceDetail",
            State::DcChargeParameterDiscovery(_) => "DC_ChargeParameterDiscovery",
            State::ScheduleExchange(_) => "ScheduleExchange",
            State::DcCableCheck(_) => "DC_CableCheck",
            State::DcPreCharge(_) => "DC_PreCharge",
            State::PowerDelivery(_) => "PowerDelivery",
            State::DcChargeLoop(_) => "DC_ChargeLoop",
            State::DcWeldingDetection(_) => "DC_WeldingDetection",
            State::SessionStop(_) => "SessionStop",
            State::Failed => "Failed",
        }
    }

    pub fn enter(&mut self, ctx: &mut Context) {
        info!("Entered state {}", self.name());
        if let State::DcChargeLoop(state) = self {
            state.enter(ctx);
        }
    }

    pub fn feed(&mut self, event: Event, ctx: &mut Context) -> Transition {
        let kind = match event {
            Event::Control(control) => {
                if let ControlEvent::UpdateDynamicModeParameters(params) = control {
                    ctx.cache_dynamic_mode_parameters = Some(params);
                }
                ctx.set_control_event(control);
                EventKind::ControlMessage
            }
            Event::Message(request) => {
                ctx.feedback.v2g_message(request.message_type());
                ctx.set_request(request);
                EventKind::V2gtpMessage
            }
        };

        let transition = match self {
            State::SessionSetup(state) => state.feed(ctx, kind),
            State::AuthorizationSetup(state) => state.feed(ctx, kind),
            State::Authorization(state) => state.feed(ctx, kind),
            State::ServiceDiscovery(state) => state.feed(ctx, kind),
            State::ServiceDetail(state) => state.feed(ctx, kind),
            State::DcChargeParameterDiscovery(state) => state.feed(ctx, kind),
            State::ScheduleExchange(state) => state.feed(ctx, kind),
            State::DcCableCheck(state) => state.feed(ctx, kind),
            State::DcPreCharge(state) => state.feed(ctx, kind),
            State::PowerDelivery(state) => state.feed(ctx, kind),
            State::DcChargeLoop(state) => state.feed(ctx, kind),
            State::DcWeldingDetection(state) => state.feed(ctx, kind),
            State::SessionStop(state) => state.feed(ctx, kind),
            State::Failed => feed_failed(ctx, kind),
        };

        ctx.clear_control_event();
        transition
    }
}

macro_rules! impl_into_state {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for State {
                fn from(state: $variant) -> Self {
                    State::$variant(state)
                }
            }
        )*
    };
}

impl_into_state!(
    SessionSetup,
    AuthorizationSetup,
    Authorization,
    ServiceDiscovery,
    ServiceDetail,
    DcChargeParameterDiscovery,
    ScheduleExchange,
    DcCableCheck,
    DcPreCharge,
    PowerDelivery,
    DcChargeLoop,
    DcWeldingDetection,
    SessionStop,
);

fn feed_failed(ctx: &mut Context, kind: EventKind) -> Transition {
    if kind == EventKind::V2gtpMessage {
        if let Some(request) = ctx.pull_request() {
            send_sequence_error(request.message_type(), ctx);
        }
    }
    Transition::Stay
}

/// Respond with `FAILED_SequenceError` to a request of type `req_type` and stop the session
pub fn send_sequence_error(req_type: MessageType, ctx: &mut Context) {
    warn!("Sequence error: unexpected {}", req_type);

    let header = ctx.session.header();
    match Response::for_request(req_type, header, ResponseCode::FailedSequenceError) {
        Some(res) => ctx.respond(res),
        None => error!("No response type for {}", req_type),
    }
    ctx.session_stopped = true;
}

/// Send `res`; returns false (and stops the session) if its code is a failure
pub(crate) fn respond_checked(ctx: &mut Context, res: impl Into<Response>) -> bool {
    let res = res.into();
    let failed = res.response_code().is_failure();
    ctx.respond(res);
    if failed {
        ctx.session_stopped = true;
    }
    !failed
}

/// Pull the request of a message event, logging if the slot is empty
pub(crate) fn pull(ctx: &mut Context, state: &str) -> Option<Request> {
    let request = ctx.pull_request();
    if request.is_none() {
        error!("{}: message event without request", state);
    }
    request
}

/// Answer a request no state handler claimed
pub(crate) fn unexpected(request: &Request, state: &str, ctx: &mut Context) -> Transition {
    info!("{}: unexpected {}", state, request.message_type());
    send_sequence_error(request.message_type(), ctx);
    Transition::Stay
}

/// Departure time relative to `now`, if it lies in the future
pub(crate) fn relative_departure_time(params: &UpdateDynamicModeParameters, now: u64) -> Option<u32> {
    let departure = params.departure_time?;
    if departure > now {
        Some(u32::try_from(departure - now).unwrap_or(u32::MAX))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::*;
    use crate::message::{PowerDeliveryRequest, Progress};

    #[test]
    fn test_sequence_error_in_service_discovery() {
        let (mut ctx, _rx) = context_with_session();
        let mut state = State::ServiceDiscovery(ServiceDiscovery);

        let req = PowerDeliveryRequest {
            header: header(&ctx),
            charge_progress: Progress::Start,
            ..Default::default()
        };
        let transition = state.feed(Event::Message(Request::PowerDelivery(req)), &mut ctx);

        assert!(transition.is_stay());
        assert!(ctx.session_stopped);
        let res = ctx.take_response().unwrap();
        assert_eq!(res.message_type(), MessageType::PowerDeliveryRes);
        assert_eq!(res.response_code(), ResponseCode::FailedSequenceError);
    }

    #[test]
    fn test_failed_state_refuses_everything() {
        let (mut ctx, _rx) = context_with_session();
        let mut state = State::Failed;

        let req = Request::SessionStop(Default::default());
        assert!(state.feed(Event::Message(req), &mut ctx).is_stay());
        assert!(ctx.session_stopped);
        assert_eq!(
            ctx.take_response().unwrap().response_code(),
            ResponseCode::FailedSequenceError
        );
    }

    #[test]
    fn test_dynamic_parameters_cached_in_any_state() {
        let (mut ctx, _rx) = context_with_session();
        let mut state = State::ServiceDiscovery(ServiceDiscovery);

        let params = UpdateDynamicModeParameters {
            departure_time: Some(1000),
            target_soc: Some(80),
            min_soc: Some(20),
        };
        let transition = state.feed(Event::Control(params.into()), &mut ctx);

        assert!(transition.is_stay());
        assert!(ctx.take_response().is_none());
        assert_eq!(ctx.cache_dynamic_mode_parameters, Some(params));
    }

    #[test]
    fn test_relative_departure_time() {
        let params = UpdateDynamicModeParameters {
            departure_time: Some(1_000),
            ..Default::default()
        };
        assert_eq!(relative_departure_time(&params, 400), Some(600));
        assert_eq!(relative_departure_time(&params, 1_000), None);
        assert_eq!(
            relative_departure_time(&UpdateDynamicModeParameters::default(), 0),
            None
        );
    }
}
