//! DC_WeldingDetection

use super::{pull, respond_checked, session_stop, unexpected, EventKind, SessionStop, Transition};
use crate::context::Context;
use crate::control::PresentVoltageCurrent;
use crate::message::{
    DcWeldingDetectionRequest, DcWeldingDetectionResponse, Processing, RationalNumber, Request,
    ResponseCode,
};
use crate::session::Session;

pub fn handle_request(
    req: &DcWeldingDetectionRequest,
    session: &Session,
    present_voltage: f32,
) -> DcWeldingDetectionResponse {
    let mut res = DcWeldingDetectionResponse::default();

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

/// EV checks the contactors for welding while the voltage drops
#[derive(Debug, Default)]
pub struct DcWeldingDetection {
    present_voltage: f32,
}

impl DcWeldingDetection {
    pub fn new(present_voltage: f32) -> Self {
        Self { present_voltage }
    }

    pub fn present_voltage(&self) -> f32 {
        self.present_voltage
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
        let Some(request) = pull(ctx, "DC_WeldingDetection") else {
            return Transition::Stay;
        };

        match request {
            Request::DcWeldingDetection(req) => {
                let res = handle_request(&req, &ctx.session, self.present_voltage);
                if !respond_checked(ctx, res) || req.processing != Processing::Finished {
                    return Transition::Stay;
                }
                Transition::to(SessionStop)
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "DC_WeldingDetection", ctx),
        }
    }
}
