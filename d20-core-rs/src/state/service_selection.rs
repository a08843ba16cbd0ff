//! ServiceSelectionReq handling
//!
//! Answered from the ServiceDetail state; there is no separate state since
//! a successful selection moves straight on to DC_ChargeParameterDiscovery.

use tracing::info;

use crate::message::{ResponseCode, ServiceSelectionRequest, ServiceSelectionResponse};
use crate::session::Session;

pub fn handle_request(
    req: &ServiceSelectionRequest,
    session: &mut Session,
) -> ServiceSelectionResponse {
    let mut res = ServiceSelectionResponse::default();

    res.header = match session.validate_and_setup_header(&req.header.session_id) {
        Ok(header) => header,
        Err(code) => {
            res.header = session.header();
            res.response_code = code;
            return res;
        }
    };

    let selection = req.selected_energy_transfer_service;
    if !session.offered_services.offers(selection.service_id) {
        res.response_code = ResponseCode::FailedNoEnergyTransferServiceSelected;
        return res;
    }

    let Some(parameters) = session
        .offered_services
        .parameter_set(selection.service_id, selection.parameter_set_id)
        .copied()
    else {
        res.response_code = ResponseCode::FailedServiceSelectionInvalid;
        return res;
    };

    info!(
        "Selected {:?} with parameter set {} ({:?}, {:?})",
        selection.service_id,
        selection.parameter_set_id,
        parameters.selected_control_mode,
        parameters.selected_mobility_needs_mode
    );
    session.select_services(parameters);

    res.response_code = ResponseCode::Ok;
    res
}
