//! ServiceDiscovery

use super::{pull, respond_checked, session_stop, unexpected, EventKind, ServiceDetail, Transition};
use crate::config::SessionConfig;
use crate::context::Context;
use crate::message::{
    Request, ResponseCode, Service, ServiceCategory, ServiceDiscoveryRequest,
    ServiceDiscoveryResponse,
};
use crate::session::Session;

/// Report the energy services on offer and fix renegotiation support.
///
/// Records the offered services in the session for ServiceDetail and
/// ServiceSelection.
pub fn handle_request(
    req: &ServiceDiscoveryRequest,
    session: &mut Session,
    config: &SessionConfig,
) -> ServiceDiscoveryResponse {
    let mut res = ServiceDiscoveryResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    let services: Vec<ServiceCategory> = config
        .supported_energy_services
        .iter()
        .copied()
        .filter(|service| match &req.supported_service_ids {
            Some(ids) => ids.contains(&service.id()),
            None => true,
        })
        .collect();

    session.offered_services.energy_services = services.clone();

    res.service_renegotiation_supported =
        session.negotiate_service_renegotiation(config.service_renegotiation_supported);
    res.energy_transfer_service_list = services
        .into_iter()
        .map(|service_id| Service {
            service_id,
            free_service: false,
        })
        .collect();
    res.response_code = ResponseCode::Ok;
    res
}

#[derive(Debug, Default)]
pub struct ServiceDiscovery;

impl ServiceDiscovery {
    pub fn feed(&mut self, ctx: &mut Context, kind: EventKind) -> Transition {
        if kind == EventKind::ControlMessage {
            return Transition::Stay;
        }
        let Some(request) = pull(ctx, "ServiceDiscovery") else {
            return Transition::Stay;
        };

        match request {
            Request::ServiceDiscovery(req) => {
                let res = handle_request(&req, &mut ctx.session, &ctx.session_config);
                if !respond_checked(ctx, res) {
                    return Transition::Stay;
                }
                Transition::to(ServiceDetail)
            }
            Request::SessionStop(req) => session_stop::handle_session_stop(&req, ctx),
            other => unexpected(&other, "ServiceDiscovery", ctx),
        }
    }
}
