//! ScheduleExchange
//!
//! Scheduled mode gets one schedule at maximum power; dynamic mode passes
//! on the mobility needs when the EVSE provides them. Also entered again
//! for a schedule renegotiation out of the charge loop.

use tracing::debug;

use super::{
    pull, relative_departure_time, respond_checked, session_stop, unexpected, DcCableCheck,
    EventKind, PowerDelivery, Transition,
};
use crate::config::DcTransferLimits;
use crate::context::Context;
use crate::control::{PresentVoltageCurrent, UpdateDynamicModeParameters};
use crate::message::{
    ControlMode, DynamicSeResParams, MobilityNeedsMode, PowerSchedule, PowerScheduleEntry,
    Processing, Request, ResponseCode, ScheduleExchangeReqControlMode, ScheduleExchangeRequest,
    ScheduleExchangeResControlMode, ScheduleExchangeResponse, ScheduleTuple, ScheduledSeResParams,
};
use crate::session::Session;

/// Validity of the single offered schedule entry, in seconds
const SCHEDULE_DURATION: u32 = 86_400;

fn scheduled_params(limits: &DcTransferLimits, time_anchor: u64, bpt: bool) -> ScheduledSeResParams {
    let charging_schedule = PowerSchedule {
        time_anchor,
        entries: vec![PowerScheduleEntry {
            duration: SCHEDULE_DURATION,
            power: limits.charge_limits.power.max,
        }],
    };

    let discharging_schedule = match (bpt, limits.discharge_limits) {
        (true, Some(discharge)) => Some(PowerSchedule {
            time_anchor,
            entries: vec![PowerScheduleEntry {
                duration: SCHEDULE_DURATION,
                power: discharge.power.max,
            }],
        }),
        _ => None,
    };

    ScheduledSeResParams {
        schedule_tuples: vec![ScheduleTuple {
            schedule_tuple_id: 1,
            charging_schedule,
            discharging_schedule,
        }],
    }
}

/// Offer a schedule (Scheduled) or the SECC's mobility needs (Dynamic).
///
/// The requested control mode has to match the selected parameter set.
pub fn handle_request(
    req: &ScheduleExchangeRequest,
    session: &Session,
    limits: &DcTransferLimits,
    dynamic_parameters: Option<&UpdateDynamicModeParameters>,
) -> ScheduleExchangeResponse {
    let mut res = ScheduleExchangeResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    let selected = session.selected_services();

    res.control_mode = match (&req.control_mode, selected.selected_control_mode) {
        (ScheduleExchangeReqControlMode::Scheduled(_), ControlMode::Scheduled) => {
            ScheduleExchangeResControlMode::Scheduled(scheduled_params(
                limits,
                res.header.timestamp,
                selected.selected_energy_service.is_bpt(),
            ))
        }
        (ScheduleExchangeReqControlMode::Dynamic(_), ControlMode::Dynamic) => {
            let mut params = DynamicSeResParams::default();
            if selected.selected_mobility_needs_mode == MobilityNeedsMode::ProvidedBySecc {
                if let Some(update) = dynamic_parameters {
                    params.departure_time = relative_departure_time(update, res.header.timestamp);
                    params.minimum_soc = update.min_soc;
                    params.target_soc = update.target_soc;
                }
            }
            ScheduleExchangeResControlMode::Dynamic(params)
        }
        (requested, selected) => {
            debug!("ScheduleExchange in {:?} mode, selected {:?}", requested, selected);
            res.response_code = ResponseCode::Failed;
            return res;
        }
    };

    res.processing = Processing::Finished;
    res.response_code = ResponseCode::Ok;
    res
}

#[derive(Debug, Default)]
pub struct ScheduleExchange {
    /// Entered from PowerDelivery(ScheduleRenegotiation) instead of ChargeParameterDiscovery
    pub renegotiation: bool,
    present_voltage: f32,
}

impl ScheduleExchange {
    pub fn renegotiation(present_voltage: f32) -> Self {
        Self {
            renegotiation: true,
            present_voltage,
        }
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
        let Some(request) = pull(ctx, "ScheduleExchange") else {
            return Transition::Stay;
        };

        match request {
            Request::ScheduleExchange(req) => {
                let res = handle_request(
                    &req,
                    &ctx.session,
                    &ctx.session_config.dc_limits,
                    ctx.cache_dynamic_mode_parameters.as_ref(),
                );
                let finished = res.processing == Processing::Finished;

                if !respond_checked(ctx, res) || !finished {
                    return Transition::Stay;
                }

                if self.renegotiation {
                    Transition::to(PowerDelivery::after_renegotiation(self.present_voltage))
                } else {
                    Transition::to(DcCableCheck::default())
                }
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "ScheduleExchange", ctx),
        }
    }
}
