//! PowerDelivery
//!
//! Start moves to the charge loop, Stop to welding detection. Pre-charge
//! requests may still arrive while the contactors close.

use tracing::{debug, info};

use super::{
    dc_pre_charge, pull, respond_checked, session_stop, unexpected, DcChargeLoop,
    DcWeldingDetection, EventKind, ScheduleExchange, Transition,
};
use crate::context::Context;
use crate::control::PresentVoltageCurrent;
use crate::feedback::Signal;
use crate::message::{PowerDeliveryRequest, PowerDeliveryResponse, Progress, Request, ResponseCode};
use crate::session::Session;

/// Validate the requested charge progress.
///
/// Standby is refused with a warning; a reported contactor fault fails
/// `Start`.
pub fn handle_request(
    req: &PowerDeliveryRequest,
    session: &Session,
    contactor_fault: bool,
) -> PowerDeliveryResponse {
    let mut res = PowerDeliveryResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    if req.charge_progress == Progress::Standby {
        res.status = None;
        res.response_code = ResponseCode::WarningStandbyNotAllowed;
        return res;
    }

    if req.charge_progress == Progress::Start && contactor_fault {
        res.response_code = ResponseCode::FailedContactorError;
        return res;
    }

    res.response_code = ResponseCode::Ok;
    res
}

#[derive(Debug, Default)]
pub struct PowerDelivery {
    present_voltage: f32,
    setup_finished_signalled: bool,
}

impl PowerDelivery {
    pub fn new(present_voltage: f32) -> Self {
        Self {
            present_voltage,
            setup_finished_signalled: false,
        }
    }

    /// Back from a schedule renegotiation; setup was finished before
    pub fn after_renegotiation(present_voltage: f32) -> Self {
        Self {
            present_voltage,
            setup_finished_signalled: true,
        }
    }

    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            if let Some(PresentVoltageCurrent { voltage, .. }) =
                ctx.get_control_event::<PresentVoltageCurrent>()
            {
                self.present_voltage = voltage;
            }
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "PowerDelivery") else {
            return Transition::Stay;
        };

        match request {
            Request::PowerDelivery(req) => {
                let res = handle_request(&req, &ctx.session, ctx.contactor_fault);
                if res.response_code.is_warning() {
                    info!("PowerDelivery {:?} answered with {}", req.charge_progress, res.response_code);
                }
                let ok = res.response_code == ResponseCode::Ok;

                if ok && req.charge_progress == Progress::Start && !self.setup_finished_signalled {
                    ctx.feedback.signal(Signal::SetupFinished);
                    self.setup_finished_signalled = true;
                }
                if ok && req.charge_progress == Progress::Stop {
                    ctx.feedback.signal(Signal::DcOpenContactor);
                }

                if !respond_checked(ctx, res) || !ok {
                    return Transition::Stay;
                }

                match req.charge_progress {
                    Progress::Start => Transition::to(DcChargeLoop::default()),
                    Progress::Stop => Transition::to(DcWeldingDetection::new(self.present_voltage)),
                    Progress::ScheduleRenegotiation => {
                        Transition::to(ScheduleExchange::renegotiation(self.present_voltage))
                    }
                    Progress::Standby => Transition::Stay,
                }
            }
            // EV may repeat pre-charge while the contactors close
            Request::DcPreCharge(req) => {
                debug!("PowerDelivery: interleaved DC_PreChargeReq");
                let res = dc_pre_charge::handle_request(&req, &ctx.session, self.present_voltage);
                if res.response_code == ResponseCode::Ok {
                    ctx.feedback
                        .dc_pre_charge_target_voltage(req.target_voltage.to_float());
                }
                respond_checked(ctx, res);
                Transition::Stay
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "PowerDelivery", ctx),
        }
    }
}
