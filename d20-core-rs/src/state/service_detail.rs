//! ServiceDetail
//!
//! Lists the parameter sets of one energy service and remembers them for
//! ServiceSelectionReq, which is also answered here.

use std::collections::BTreeMap;

use super::{
    pull, respond_checked, service_selection, session_stop, unexpected, DcChargeParameterDiscovery,
    EventKind, Transition,
};
use crate::config::{DcBptParameterSet, DcParameterSet, SessionConfig};
use crate::context::Context;
use crate::message::{
    Parameter, ParameterSet, Request, ResponseCode, ServiceCategory, ServiceDetailRequest,
    ServiceDetailResponse,
};
use crate::session::{SelectedServiceParameters, Session};

fn dc_parameters(set: &DcParameterSet) -> Vec<Parameter> {
    vec![
        Parameter::int("Connector", set.connector as i32),
        Parameter::int("ControlMode", set.control_mode as i32),
        Parameter::int("MobilityNeedsMode", set.mobility_needs_mode as i32),
        Parameter::int("Pricing", set.pricing as i32),
    ]
}

fn dc_bpt_parameters(set: &DcBptParameterSet) -> Vec<Parameter> {
    let mut parameters = dc_parameters(&set.dc);
    parameters.push(Parameter::int("BPTChannel", set.bpt_channel as i32));
    parameters.push(Parameter::int("GeneratorMode", set.generator_mode as i32));
    parameters
}

fn selected(service: ServiceCategory, set: &DcParameterSet) -> SelectedServiceParameters {
    SelectedServiceParameters {
        selected_energy_service: service,
        selected_connector: set.connector,
        selected_control_mode: set.control_mode,
        selected_mobility_needs_mode: set.mobility_needs_mode,
        selected_pricing: set.pricing,
        selected_bpt_channel: None,
        selected_generator_mode: None,
    }
}

/// List the parameter sets of one offered energy service
pub fn handle_request(
    req: &ServiceDetailRequest,
    session: &mut Session,
    config: &SessionConfig,
) -> ServiceDetailResponse {
    let mut res = ServiceDetailResponse {
        service: req.service,
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

    if !session.offered_services.offers(req.service) {
        res.response_code = ResponseCode::FailedServiceIdInvalid;
        return res;
    }

    let mut sets = BTreeMap::new();
    match req.service {
        ServiceCategory::Dc | ServiceCategory::Mcs => {
            for (id, set) in config.dc_parameter_list.iter().enumerate() {
                let id = id as u16;
                res.service_parameter_list.push(ParameterSet {
                    id,
                    parameters: dc_parameters(set),
                });
                sets.insert(id, selected(req.service, set));
            }
        }
        ServiceCategory::DcBpt | ServiceCategory::McsBpt => {
            for (id, set) in config.dc_bpt_parameter_list.iter().enumerate() {
                let id = id as u16;
                res.service_parameter_list.push(ParameterSet {
                    id,
                    parameters: dc_bpt_parameters(set),
                });
                sets.insert(
                    id,
                    SelectedServiceParameters {
                        selected_bpt_channel: Some(set.bpt_channel),
                        selected_generator_mode: Some(set.generator_mode),
                        ..selected(req.service, &set.dc)
                    },
                );
            }
        }
        _ => {
            res.response_code = ResponseCode::FailedServiceIdInvalid;
            return res;
        }
    }

    session.offered_services.parameter_sets.insert(req.service, sets);
    res.response_code = ResponseCode::Ok;
    res
}

/// Answers ServiceDetailReq until the EV selects a service
#[derive(Debug, Default)]
pub struct ServiceDetail;

impl ServiceDetail {
    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "ServiceDetail") else {
            return Transition::Stay;
        };

        match request {
            Request::ServiceDetail(req) => {
                let res = handle_request(&req, &mut ctx.session, &ctx.session_config);
                respond_checked(ctx, res);
                Transition::Stay
            }
            Request::ServiceSelection(req) => {
                let res = service_selection::handle_request(&req, &mut ctx.session);
                if !respond_checked(ctx, res) {
                    return Transition::Stay;
                }
                Transition::to(DcChargeParameterDiscovery)
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "ServiceDetail", ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvseSetupConfig;
    use crate::context::testing::*;
    use crate::message::{BptChannel, ControlMode, ParameterValue};

    fn offer(ctx: &mut Context, services: &[ServiceCategory]) {
        ctx.session.offered_services.energy_services = services.to_vec();
    }

    #[test]
    fn test_service_not_offered() {
        let (mut ctx, _rx) = context_with_session();
        offer(&mut ctx, &[ServiceCategory::Dc]);
        let req = ServiceDetailRequest {
            header: header(&ctx),
            service: ServiceCategory::DcBpt,
        };

        let res = handle_request(&req, &mut ctx.session, &SessionConfig::default());

        assert_eq!(res.response_code, ResponseCode::FailedServiceIdInvalid);
        assert_eq!(res.service, ServiceCategory::DcBpt);
    }

    #[test]
    fn test_dc_parameter_sets() {
        let (mut ctx, _rx) = context_with_session();
        offer(&mut ctx, &[ServiceCategory::Dc]);
        let req = ServiceDetailRequest {
            header: header(&ctx),
            service: ServiceCategory::Dc,
        };

        let res = handle_request(&req, &mut ctx.session, &SessionConfig::default());

        assert_eq!(res.response_code, ResponseCode::Ok);
        assert_eq!(res.service_parameter_list.len(), 2);

        let names: Vec<&str> = res.service_parameter_list[0]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Connector", "ControlMode", "MobilityNeedsMode", "Pricing"]);
        assert_eq!(
            res.service_parameter_list[1].parameters[1].value,
            ParameterValue::Int(ControlMode::Dynamic as i32)
        );

        let offered = ctx
            .session
            .offered_services
            .parameter_set(ServiceCategory::Dc, 1)
            .unwrap();
        assert_eq!(offered.selected_control_mode, ControlMode::Dynamic);
    }

    #[test]
    fn test_dc_bpt_parameter_sets() {
        let (mut ctx, _rx) = context_with_session();
        offer(&mut ctx, &[ServiceCategory::DcBpt]);
        let config = SessionConfig::new(
            &EvseSetupConfig::default().with_energy_services(vec![ServiceCategory::DcBpt]),
        );
        let req = ServiceDetailRequest {
            header: header(&ctx),
            service: ServiceCategory::DcBpt,
        };

        let res = handle_request(&req, &mut ctx.session, &config);

        assert_eq!(res.response_code, ResponseCode::Ok);
        let names: Vec<&str> = res.service_parameter_list[0]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Connector",
                "ControlMode",
                "MobilityNeedsMode",
                "Pricing",
                "BPTChannel",
                "GeneratorMode"
            ]
        );

        let offered = ctx
            .session
            .offered_services
            .parameter_set(ServiceCategory::DcBpt, 0)
            .unwrap();
        assert_eq!(offered.selected_bpt_channel, Some(BptChannel::Unified));
    }

    #[test]
    fn test_unknown_session() {
        let (mut ctx, _rx) = context_with_session();
        offer(&mut ctx, &[ServiceCategory::Dc]);
        let req = ServiceDetailRequest::default();

        let res = handle_request(&req, &mut ctx.session, &SessionConfig::default());
        assert_eq!(res.response_code, ResponseCode::FailedUnknownSession);
        assert!(res.service_parameter_list.is_empty());
    }
}
