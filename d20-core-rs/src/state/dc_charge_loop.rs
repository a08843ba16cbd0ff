//! DC_ChargeLoop
//!
//! The EV repeats DC_ChargeLoopReq with its targets and limits; the EVSE
//! answers with present voltage/current and its own limits for the control
//! mode in use. Stop and pause requests from the charger are passed to the
//! EV through the EVSE status notification. The loop ends with
//! PowerDeliveryReq(Stop).

use tracing::{debug, error, info};

use super::{
    power_delivery, pull, relative_departure_time, respond_checked, session_stop, unexpected,
    DcWeldingDetection, EventKind, ScheduleExchange, Transition,
};
use crate::config::DcTransferLimits;
use crate::context::Context;
use crate::control::{PauseCharging, PresentVoltageCurrent, StopCharging, UpdateDynamicModeParameters};
use crate::feedback::{ChargeLoopReq, Signal};
use crate::message::{
    BptDynamicDcClRes, BptScheduledDcClRes, ControlMode, DcChargeLoopReqControlMode,
    DcChargeLoopRequest, DcChargeLoopResControlMode, DcChargeLoopResponse, DynamicDcClRes,
    EvseNotification, EvseStatus, MobilityNeedsMode, Progress, RationalNumber, Request,
    ResponseCode, ScheduledDcClRes,
};
use crate::session::Session;

/// Seconds the EV gets to acknowledge changed dynamic mode targets
const ACK_MAX_DELAY: u16 = 30;
/// Seconds the EV gets to react to a pause notification in dynamic mode
const DYNAMIC_PAUSE_MAX_DELAY: u16 = 60;

fn scheduled_res(limits: &DcTransferLimits) -> ScheduledDcClRes {
    ScheduledDcClRes {
        max_charge_power: Some(limits.charge_limits.power.max),
        min_charge_power: Some(limits.charge_limits.power.min),
        max_charge_current: Some(limits.charge_limits.current.max),
        max_voltage: Some(limits.voltage.max),
    }
}

fn dynamic_res(
    session: &Session,
    limits: &DcTransferLimits,
    dynamic_parameters: Option<&UpdateDynamicModeParameters>,
    now: u64,
) -> DynamicDcClRes {
    let mut res = DynamicDcClRes {
        ack_max_delay: Some(ACK_MAX_DELAY),
        max_charge_power: limits.charge_limits.power.max,
        min_charge_power: limits.charge_limits.power.min,
        max_charge_current: limits.charge_limits.current.max,
        max_voltage: limits.voltage.max,
        ..Default::default()
    };

    let secc_provided =
        session.selected_services().selected_mobility_needs_mode == MobilityNeedsMode::ProvidedBySecc;
    if let (true, Some(params)) = (secc_provided, dynamic_parameters) {
        res.departure_time = relative_departure_time(params, now);
        res.minimum_soc = params.min_soc;
        res.target_soc = params.target_soc;
    }
    res
}

fn evse_status(stop: bool, pause: bool, control_mode: ControlMode) -> Option<EvseStatus> {
    if stop {
        Some(EvseStatus {
            notification_max_delay: 0,
            notification: EvseNotification::Terminate,
        })
    } else if pause {
        let notification_max_delay = match control_mode {
            ControlMode::Dynamic => DYNAMIC_PAUSE_MAX_DELAY,
            ControlMode::Scheduled => 0,
        };
        Some(EvseStatus {
            notification_max_delay,
            notification: EvseNotification::Pause,
        })
    } else {
        None
    }
}

/// Answer one charge loop iteration.
///
/// The request's control mode has to match the selected parameter set,
/// both scheduled/dynamic and unidirectional/BPT.
pub fn handle_request(
    req: &DcChargeLoopRequest,
    session: &Session,
    present: PresentVoltageCurrent,
    stop: bool,
    pause: bool,
    limits: &DcTransferLimits,
    dynamic_parameters: Option<&UpdateDynamicModeParameters>,
) -> DcChargeLoopResponse {
    let mut res = DcChargeLoopResponse {
        control_mode: DcChargeLoopResControlMode::matching(&req.control_mode),
        ..Default::default()
    };

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    let selected = session.selected_services();
    let control_mode = req.control_mode.control_mode();
    if control_mode != selected.selected_control_mode
        || req.control_mode.is_bpt() != selected.selected_energy_service.is_bpt()
    {
        debug!(
            "DC_ChargeLoopReq in {:?} (bpt: {}), selected {:?} / {:?}",
            control_mode,
            req.control_mode.is_bpt(),
            selected.selected_control_mode,
            selected.selected_energy_service
        );
        res.response_code = ResponseCode::Failed;
        return res;
    }

    let discharge = match (req.control_mode.is_bpt(), limits.discharge_limits) {
        (true, None) => {
            error!("BPT charge loop without configured discharge limits");
            res.response_code = ResponseCode::Failed;
            return res;
        }
        (_, discharge) => discharge.unwrap_or_default(),
    };
    res.control_mode = match req.control_mode {
        DcChargeLoopReqControlMode::Scheduled(_) => {
            DcChargeLoopResControlMode::Scheduled(scheduled_res(limits))
        }
        DcChargeLoopReqControlMode::ScheduledBpt(_) => {
            DcChargeLoopResControlMode::ScheduledBpt(BptScheduledDcClRes {
                scheduled: scheduled_res(limits),
                min_voltage: Some(limits.voltage.min),
                max_discharge_power: Some(discharge.power.max),
                min_discharge_power: Some(discharge.power.min),
                max_discharge_current: Some(discharge.current.max),
            })
        }
        DcChargeLoopReqControlMode::Dynamic(_) => DcChargeLoopResControlMode::Dynamic(dynamic_res(
            session,
            limits,
            dynamic_parameters,
            res.header.timestamp,
        )),
        DcChargeLoopReqControlMode::DynamicBpt(_) => {
            DcChargeLoopResControlMode::DynamicBpt(BptDynamicDcClRes {
                dynamic: dynamic_res(session, limits, dynamic_parameters, res.header.timestamp),
                min_voltage: limits.voltage.min,
                max_discharge_power: discharge.power.max,
                min_discharge_power: discharge.power.min,
                max_discharge_current: discharge.current.max,
            })
        }
    };

    res.present_voltage = RationalNumber::from_float(present.voltage);
    res.present_current = RationalNumber::from_float(present.current);
    res.status = evse_status(stop, pause, control_mode);
    res.response_code = ResponseCode::Ok;
    res
}

#[derive(Debug)]
pub struct DcChargeLoop {
    present: PresentVoltageCurrent,
    stop: bool,
    pause: bool,
    first_entry: bool,
    dynamic_parameters: Option<UpdateDynamicModeParameters>,
}

impl Default for DcChargeLoop {
    fn default() -> Self {
        Self {
            present: PresentVoltageCurrent {
                voltage: 0.0,
                current: 0.0,
            },
            stop: false,
            pause: false,
            first_entry: true,
            dynamic_parameters: None,
        }
    }
}

impl DcChargeLoop {
    /// Pick up dynamic mode parameters that arrived before the loop started
    pub fn enter(&mut self, ctx: &mut Context) {
        if let Some(params) = ctx.cache_dynamic_mode_parameters {
            self.dynamic_parameters = Some(params);
        }
    }

    fn on_control(&mut self, ctx: &Context) {
        if let Some(present) = ctx.get_control_event::<PresentVoltageCurrent>() {
            self.present = present;
        } else if let Some(StopCharging(stop)) = ctx.get_control_event::<StopCharging>() {
            if stop {
                info!("Charger requested stop");
            }
            self.stop = stop;
        } else if let Some(PauseCharging(pause)) = ctx.get_control_event::<PauseCharging>() {
            if pause {
                info!("Charger requested pause");
            }
            self.pause = pause;
        } else if let Some(params) = ctx.get_control_event::<UpdateDynamicModeParameters>() {
            self.dynamic_parameters = Some(params);
        }
    }

    fn report(ctx: &mut Context, req: &DcChargeLoopRequest) {
        ctx.feedback
            .dc_charge_loop_req(ChargeLoopReq::ControlMode(req.control_mode));
        ctx.feedback
            .dc_charge_loop_req(ChargeLoopReq::PresentVoltage(req.present_voltage.to_float()));
        ctx.feedback
            .dc_charge_loop_req(ChargeLoopReq::MeterInfoRequested(req.meter_info_requested));
        if let Some(display) = req.display_parameters {
            ctx.feedback
                .dc_charge_loop_req(ChargeLoopReq::DisplayParameters(display));
        }
    }

    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            self.on_control(ctx);
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "DC_ChargeLoop") else {
            return Transition::Stay;
        };

        match request {
            Request::DcChargeLoop(req) => {
                if self.first_entry {
                    ctx.feedback.signal(Signal::ChargeLoopStarted);
                    self.first_entry = false;
                }

                let res = handle_request(
                    &req,
                    &ctx.session,
                    self.present,
                    self.stop,
                    self.pause,
                    &ctx.session_config.dc_limits,
                    self.dynamic_parameters.as_ref(),
                );
                if res.response_code == ResponseCode::Ok {
                    Self::report(ctx, &req);
                }

                respond_checked(ctx, res);
                Transition::Stay
            }
            Request::PowerDelivery(req) => {
                let res = power_delivery::handle_request(&req, &ctx.session, ctx.contactor_fault);
                let ok = res.response_code == ResponseCode::Ok;

                if ok && req.charge_progress == Progress::Stop {
                    ctx.feedback.signal(Signal::ChargeLoopFinished);
                    ctx.feedback.signal(Signal::DcOpenContactor);
                }

                if !respond_checked(ctx, res) || !ok {
                    return Transition::Stay;
                }

                match req.charge_progress {
                    Progress::Stop => Transition::to(DcWeldingDetection::new(self.present.voltage)),
                    Progress::ScheduleRenegotiation => {
                        Transition::to(ScheduleExchange::renegotiation(self.present.voltage))
                    }
                    Progress::Start | Progress::Standby => Transition::Stay,
                }
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "DC_ChargeLoop", ctx),
        }
    }
}
