//! DC_PreCharge: echo the present voltage while the EVSE ramps to the EV target

use super::{pull, respond_checked, session_stop, unexpected, EventKind, PowerDelivery, Transition};
use crate::context::Context;
use crate::control::PresentVoltageCurrent;
use crate::feedback::Signal;
use crate::message::{DcPreChargeRequest, DcPreChargeResponse, RationalNumber, Request, ResponseCode};
use crate::session::Session;

/// Echo the charger's present voltage back to the EV
pub fn handle_request(
    req: &DcPreChargeRequest,
    session: &Session,
    present_voltage: f32,
) -> DcPreChargeResponse {
    let mut res = DcPreChargeResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    res.present_voltage = RationalNumber::from_float(present_voltage);
    res.response_code = ResponseCode::Ok;
    res
}

#[derive(Debug, Default)]
pub struct DcPreCharge {
    present_voltage: f32,
    pre_charge_initiated: bool,
}

impl DcPreCharge {
    pub fn with_present_voltage(present_voltage: f32) -> Self {
        Self {
            present_voltage,
            ..Default::default()
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
        let Some(request) = pull(ctx, "DC_PreCharge") else {
            return Transition::Stay;
        };

        match request {
            Request::DcPreCharge(req) => {
                let res = handle_request(&req, &ctx.session, self.present_voltage);

                if res.response_code == ResponseCode::Ok {
                    if !self.pre_charge_initiated {
                        ctx.feedback.signal(Signal::PreChargeStarted);
                        self.pre_charge_initiated = true;
                    }
                    ctx.feedback
                        .dc_pre_charge_target_voltage(req.target_voltage.to_float());
                }

                if !respond_checked(ctx, res) {
                    return Transition::Stay;
                }
                Transition::to(PowerDelivery::new(self.present_voltage))
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "DC_PreCharge", ctx),
        }
    }
}
