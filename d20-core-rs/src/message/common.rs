//! Session and service negotiation messages
//!
//! Everything exchanged before the DC specific phases plus SessionStop.

use serde::{Deserialize, Serialize};

use super::datatypes::*;

// ============================================================================
// SessionSetup
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSetupRequest {
    pub header: Header,
    pub evccid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSetupResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub evseid: String,
}

// ============================================================================
// Authorization
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationSetupRequest {
    pub header: Header,
}

/// Authorization mode offered in AuthorizationSetupRes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum AuthorizationMode {
    #[default]
    Eim,
    Pnc {
        gen_challenge: Vec<u8>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationSetupResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub authorization_services: Vec<Authorization>,
    pub certificate_installation_service: bool,
    pub authorization_mode: AuthorizationMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub header: Header,
    pub selected_authorization_service: Authorization,
    /// Challenge echoed back by the EV for PnC
    pub gen_challenge: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub evse_processing: Processing,
}

// ============================================================================
// Service negotiation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub service_id: ServiceCategory,
    pub free_service: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDiscoveryRequest {
    pub header: Header,
    /// Service ids the EV is interested in; `None` means all
    pub supported_service_ids: Option<Vec<u16>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDiscoveryResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub service_renegotiation_supported: bool,
    pub energy_transfer_service_list: Vec<Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetailRequest {
    pub header: Header,
    pub service: ServiceCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn int(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::Int(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub id: u16,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetailResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub service: ServiceCategory,
    pub service_parameter_list: Vec<ParameterSet>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedService {
    pub service_id: ServiceCategory,
    pub parameter_set_id: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSelectionRequest {
    pub header: Header,
    pub selected_energy_transfer_service: SelectedService,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSelectionResponse {
    pub header: Header,
    pub response_code: ResponseCode,
}

// ============================================================================
// SessionStop
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStopRequest {
    pub header: Header,
    pub charging_session: ChargingSession,
    pub ev_termination_code: Option<String>,
    pub ev_termination_explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStopResponse {
    pub header: Header,
    pub response_code: ResponseCode,
}
