//! DC_ChargeParameterDiscovery: EVSE transfer limits for DC or DC_BPT

use tracing::error;

use super::{pull, respond_checked, session_stop, unexpected, EventKind, ScheduleExchange, Transition};
use crate::config::DcTransferLimits;
use crate::context::Context;
use crate::feedback::DcMaximumLimits;
use crate::message::{
    BptDcCpdResParams, DcChargeParameterDiscoveryRequest, DcChargeParameterDiscoveryResponse,
    DcCpdReqTransferMode, DcCpdResParams, DcCpdResTransferMode, Request, ResponseCode,
    ServiceCategory,
};
use crate::session::Session;

fn charge_params(limits: &DcTransferLimits) -> DcCpdResParams {
    DcCpdResParams {
        max_charge_power: limits.charge_limits.power.max,
        min_charge_power: limits.charge_limits.power.min,
        max_charge_current: limits.charge_limits.current.max,
        min_charge_current: limits.charge_limits.current.min,
        max_voltage: limits.voltage.max,
        min_voltage: limits.voltage.min,
        power_ramp_limit: limits.power_ramp_limit,
    }
}

/// Answer with the EVSE limits for the transfer mode of the selected service
pub fn handle_request(
    req: &DcChargeParameterDiscoveryRequest,
    session: &Session,
    limits: &DcTransferLimits,
) -> DcChargeParameterDiscoveryResponse {
    let mut res = DcChargeParameterDiscoveryResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    let service = session.selected_services().selected_energy_service;

    match req.transfer_mode {
        DcCpdReqTransferMode::Dc(_) => {
            if !matches!(service, ServiceCategory::Dc | ServiceCategory::Mcs) {
                res.response_code = ResponseCode::FailedWrongChargeParameter;
                return res;
            }
            res.transfer_mode = DcCpdResTransferMode::Dc(charge_params(limits));
        }
        DcCpdReqTransferMode::BptDc(_) => {
            if !matches!(service, ServiceCategory::DcBpt | ServiceCategory::McsBpt) {
                res.response_code = ResponseCode::FailedWrongChargeParameter;
                return res;
            }
            let Some(discharge) = limits.discharge_limits else {
                error!("{:?} selected but no discharge limits configured", service);
                res.response_code = ResponseCode::FailedWrongChargeParameter;
                return res;
            };
            res.transfer_mode = DcCpdResTransferMode::BptDc(BptDcCpdResParams {
                charge: charge_params(limits),
                max_discharge_power: discharge.power.max,
                min_discharge_power: discharge.power.min,
                max_discharge_current: discharge.current.max,
                min_discharge_current: discharge.current.min,
            });
        }
    }

    res.response_code = ResponseCode::Ok;
    res
}

#[derive(Debug, Default)]
pub struct DcChargeParameterDiscovery;

impl DcChargeParameterDiscovery {
    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "DC_ChargeParameterDiscovery") else {
            return Transition::Stay;
        };

        match request {
            Request::DcChargeParameterDiscovery(req) => {
                let res = handle_request(&req, &ctx.session, &ctx.session_config.dc_limits);

                if res.response_code == ResponseCode::Ok {
                    let ev = req.transfer_mode.charge_params();
                    ctx.feedback.dc_max_limits(DcMaximumLimits {
                        voltage: ev.max_voltage.to_float(),
                        current: ev.max_charge_current.to_float(),
                        power: ev.max_charge_power.to_float(),
                    });
                }

                if !respond_checked(ctx, res) {
                    return Transition::Stay;
                }
                Transition::to(ScheduleExchange::default())
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "DC_ChargeParameterDiscovery", ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Limits, PowerCurrentLimits};
    use crate::context::testing::*;
    use crate::feedback::FeedbackEvent;
    use crate::message::{BptDcCpdReqParams, DcCpdReqParams, RationalNumber};
    use crate::session::SelectedServiceParameters;
    use crate::state::{Event, State};

    fn select(ctx: &mut Context, service: ServiceCategory) {
        ctx.session.select_services(SelectedServiceParameters {
            selected_energy_service: service,
            ..Default::default()
        });
    }

    fn ev_params() -> DcCpdReqParams {
        DcCpdReqParams {
            max_charge_power: RationalNumber::new(150, 3),
            max_charge_current: RationalNumber::new(300, 0),
            max_voltage: RationalNumber::new(800, 0),
            ..Default::default()
        }
    }

    #[test]
    fn test_dc_mode_returns_limits() {
        let (mut ctx, mut rx) = context_with_session();
        select(&mut ctx, ServiceCategory::Dc);

        let req = DcChargeParameterDiscoveryRequest {
            header: header(&ctx),
            transfer_mode: DcCpdReqTransferMode::Dc(ev_params()),
        };
        let mut state = State::DcChargeParameterDiscovery(DcChargeParameterDiscovery);
        let transition = state.feed(
            Event::Message(Request::DcChargeParameterDiscovery(req)),
            &mut ctx,
        );

        assert!(matches!(transition, Transition::To(State::ScheduleExchange(_))));
        let Some(crate::message::Response::DcChargeParameterDiscovery(res)) = ctx.take_response()
        else {
            panic!("expected DC_ChargeParameterDiscoveryRes");
        };
        assert_eq!(res.response_code, ResponseCode::Ok);
        match res.transfer_mode {
            DcCpdResTransferMode::Dc(params) => {
                assert_eq!(params.max_voltage, RationalNumber::new(900, 0));
                assert_eq!(params.max_charge_current, RationalNumber::new(250, 0));
            }
            DcCpdResTransferMode::BptDc(_) => panic!("expected DC transfer mode"),
        }

        let limits: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                FeedbackEvent::DcMaxLimits(limits) => Some(limits),
                _ => None,
            })
            .collect();
        assert_eq!(
            limits,
            vec![DcMaximumLimits {
                voltage: 800.0,
                current: 300.0,
                power: 150_000.0,
            }]
        );
    }

    #[test]
    fn test_bpt_mode_with_dc_service_selected() {
        let (mut ctx, _rx) = context_with_session();
        select(&mut ctx, ServiceCategory::Dc);

        let req = DcChargeParameterDiscoveryRequest {
            header: header(&ctx),
            transfer_mode: DcCpdReqTransferMode::BptDc(BptDcCpdReqParams::default()),
        };
        let res = handle_request(&req, &ctx.session, &DcTransferLimits::default());
        assert_eq!(res.response_code, ResponseCode::FailedWrongChargeParameter);
    }

    #[test]
    fn test_dc_mode_with_bpt_service_selected() {
        let (mut ctx, _rx) = context_with_session();
        select(&mut ctx, ServiceCategory::DcBpt);

        let req = DcChargeParameterDiscoveryRequest {
            header: header(&ctx),
            transfer_mode: DcCpdReqTransferMode::Dc(ev_params()),
        };
        let res = handle_request(&req, &ctx.session, &DcTransferLimits::default());
        assert_eq!(res.response_code, ResponseCode::FailedWrongChargeParameter);
    }

    #[test]
    fn test_bpt_needs_discharge_limits() {
        let (mut ctx, _rx) = context_with_session();
        select(&mut ctx, ServiceCategory::DcBpt);

        let req = DcChargeParameterDiscoveryRequest {
            header: header(&ctx),
            transfer_mode: DcCpdReqTransferMode::BptDc(BptDcCpdReqParams::default()),
        };
        let res = handle_request(&req, &ctx.session, &DcTransferLimits::default());
        assert_eq!(res.response_code, ResponseCode::FailedWrongChargeParameter);

        let limits = DcTransferLimits {
            discharge_limits: Some(PowerCurrentLimits {
                power: Limits::new(RationalNumber::new(11, 3), RationalNumber::new(0, 0)),
                current: Limits::new(RationalNumber::new(25, 0), RationalNumber::new(0, 0)),
            }),
            ..Default::default()
        };
        let res = handle_request(&req, &ctx.session, &limits);
        assert_eq!(res.response_code, ResponseCode::Ok);
        match res.transfer_mode {
            DcCpdResTransferMode::BptDc(params) => {
                assert_eq!(params.max_discharge_power, RationalNumber::new(11, 3));
            }
            DcCpdResTransferMode::Dc(_) => panic!("expected BPT transfer mode"),
        }
    }

    #[test]
    fn test_unknown_session() {
        let (ctx, _rx) = context_with_session();
        let req = DcChargeParameterDiscoveryRequest::default();

        let res = handle_request(&req, &ctx.session, &DcTransferLimits::default());
        assert_eq!(res.response_code, ResponseCode::FailedUnknownSession);
    }
}
