//! ISO 15118-20 message values
//!
//! The core never touches EXI bytes. Requests arrive already decoded as
//! [`Request`] and responses leave as [`Response`]; the codec boundary
//! (see [`crate::codec`]) converts between these values and bytes.

pub mod common;
pub mod datatypes;
pub mod dc;

use serde::{Deserialize, Serialize};

pub use common::*;
pub use datatypes::*;
pub use dc::*;

/// Message type tag, used for logging, feedback and sequence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    SessionSetupReq,
    SessionSetupRes,
    AuthorizationSetupReq,
    AuthorizationSetupRes,
    AuthorizationReq,
    AuthorizationRes,
    ServiceDiscoveryReq,
    ServiceDiscoveryRes,
    ServiceDetailReq,
    ServiceDetailRes,
    ServiceSelectionReq,
    ServiceSelectionRes,
    DcChargeParameterDiscoveryReq,
    DcChargeParameterDiscoveryRes,
    ScheduleExchangeReq,
    ScheduleExchangeRes,
    DcCableCheckReq,
    DcCableCheckRes,
    DcPreChargeReq,
    DcPreChargeRes,
    PowerDeliveryReq,
    PowerDeliveryRes,
    DcChargeLoopReq,
    DcChargeLoopRes,
    DcWeldingDetectionReq,
    DcWeldingDetectionRes,
    SessionStopReq,
    SessionStopRes,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    SessionSetup(SessionSetupRequest),
    AuthorizationSetup(AuthorizationSetupRequest),
    Authorization(AuthorizationRequest),
    ServiceDiscovery(ServiceDiscoveryRequest),
    ServiceDetail(ServiceDetailRequest),
    ServiceSelection(ServiceSelectionRequest),
    DcChargeParameterDiscovery(DcChargeParameterDiscoveryRequest),
    ScheduleExchange(ScheduleExchangeRequest),
    DcCableCheck(DcCableCheckRequest),
    DcPreCharge(DcPreChargeRequest),
    PowerDelivery(PowerDeliveryRequest),
    DcChargeLoop(DcChargeLoopRequest),
    DcWeldingDetection(DcWeldingDetectionRequest),
    SessionStop(SessionStopRequest),
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::SessionSetup(_) => MessageType::SessionSetupReq,
            Request::AuthorizationSetup(_) => MessageType::AuthorizationSetupReq,
            Request::Authorization(_) => MessageType::AuthorizationReq,
            Request::ServiceDiscovery(_) => MessageType::ServiceDiscoveryReq,
            Request::ServiceDetail(_) => MessageType::ServiceDetailReq,
            Request::ServiceSelection(_) => MessageType::ServiceSelectionReq,
            Request::DcChargeParameterDiscovery(_) => MessageType::DcChargeParameterDiscoveryReq,
            Request::ScheduleExchange(_) => MessageType::ScheduleExchangeReq,
            Request::DcCableCheck(_) => MessageType::DcCableCheckReq,
            Request::DcPreCharge(_) => MessageType::DcPreChargeReq,
            Request::PowerDelivery(_) => MessageType::PowerDeliveryReq,
            Request::DcChargeLoop(_) => MessageType::DcChargeLoopReq,
            Request::DcWeldingDetection(_) => MessageType::DcWeldingDetectionReq,
            Request::SessionStop(_) => MessageType::SessionStopReq,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Request::SessionSetup(req) => &req.header,
            Request::AuthorizationSetup(req) => &req.header,
            Request::Authorization(req) => &req.header,
            Request::ServiceDiscovery(req) => &req.header,
            Request::ServiceDetail(req) => &req.header,
            Request::ServiceSelection(req) => &req.header,
            Request::DcChargeParameterDiscovery(req) => &req.header,
            Request::ScheduleExchange(req) => &req.header,
            Request::DcCableCheck(req) => &req.header,
            Request::DcPreCharge(req) => &req.header,
            Request::PowerDelivery(req) => &req.header,
            Request::DcChargeLoop(req) => &req.header,
            Request::DcWeldingDetection(req) => &req.header,
            Request::SessionStop(req) => &req.header,
        }
    }
}

/// Outbound message handed to the codec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    SessionSetup(SessionSetupResponse),
    AuthorizationSetup(AuthorizationSetupResponse),
    Authorization(AuthorizationResponse),
    ServiceDiscovery(ServiceDiscoveryResponse),
    ServiceDetail(ServiceDetailResponse),
    ServiceSelection(ServiceSelectionResponse),
    DcChargeParameterDiscovery(DcChargeParameterDiscoveryResponse),
    ScheduleExchange(ScheduleExchangeResponse),
    DcCableCheck(DcCableCheckResponse),
    DcPreCharge(DcPreChargeResponse),
    PowerDelivery(PowerDeliveryResponse),
    DcChargeLoop(DcChargeLoopResponse),
    DcWeldingDetection(DcWeldingDetectionResponse),
    SessionStop(SessionStopResponse),
}

impl Response {
    pub fn message_type(&self) -> MessageType {
        match self {
            Response::SessionSetup(_) => MessageType::SessionSetupRes,
            Response::AuthorizationSetup(_) => MessageType::AuthorizationSetupRes,
            Response::Authorization(_) => MessageType::AuthorizationRes,
            Response::ServiceDiscovery(_) => MessageType::ServiceDiscoveryRes,
            Response::ServiceDetail(_) => MessageType::ServiceDetailRes,
            Response::ServiceSelection(_) => MessageType::ServiceSelectionRes,
            Response::DcChargeParameterDiscovery(_) => MessageType::DcChargeParameterDiscoveryRes,
            Response::ScheduleExchange(_) => MessageType::ScheduleExchangeRes,
            Response::DcCableCheck(_) => MessageType::DcCableCheckRes,
            Response::DcPreCharge(_) => MessageType::DcPreChargeRes,
            Response::PowerDelivery(_) => MessageType::PowerDeliveryRes,
            Response::DcChargeLoop(_) => MessageType::DcChargeLoopRes,
            Response::DcWeldingDetection(_) => MessageType::DcWeldingDetectionRes,
            Response::SessionStop(_) => MessageType::SessionStopRes,
        }
    }

    pub fn response_code(&self) -> ResponseCode {
        match self {
            Response::SessionSetup(res) => res.response_code,
            Response::AuthorizationSetup(res) => res.response_code,
            Response::Authorization(res) => res.response_code,
            Response::ServiceDiscovery(res) => res.response_code,
            Response::ServiceDetail(res) => res.response_code,
            Response::ServiceSelection(res) => res.response_code,
            Response::DcChargeParameterDiscovery(res) => res.response_code,
            Response::ScheduleExchange(res) => res.response_code,
            Response::DcCableCheck(res) => res.response_code,
            Response::DcPreCharge(res) => res.response_code,
            Response::PowerDelivery(res) => res.response_code,
            Response::DcChargeLoop(res) => res.response_code,
            Response::DcWeldingDetection(res) => res.response_code,
            Response::SessionStop(res) => res.response_code,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Response::SessionSetup(res) => &res.header,
            Response::AuthorizationSetup(res) => &res.header,
            Response::Authorization(res) => &res.header,
            Response::ServiceDiscovery(res) => &res.header,
            Response::ServiceDetail(res) => &res.header,
            Response::ServiceSelection(res) => &res.header,
            Response::DcChargeParameterDiscovery(res) => &res.header,
            Response::ScheduleExchange(res) => &res.header,
            Response::DcCableCheck(res) => &res.header,
            Response::DcPreCharge(res) => &res.header,
            Response::PowerDelivery(res) => &res.header,
            Response::DcChargeLoop(res) => &res.header,
            Response::DcWeldingDetection(res) => &res.header,
            Response::SessionStop(res) => &res.header,
        }
    }

    /// Default response answering a request of type `req_type` with `code`.
    ///
    /// Returns `None` when `req_type` is not a request type.
    pub fn for_request(req_type: MessageType, header: Header, code: ResponseCode) -> Option<Self> {
        let res = match req_type {
            MessageType::SessionSetupReq => Response::SessionSetup(SessionSetupResponse {
                header,
                response_code: code,
                ..Default::default()
            }),
            MessageType::AuthorizationSetupReq => {
                Response::AuthorizationSetup(AuthorizationSetupResponse {
                    header,
                    response_code: code,
                    ..Default::default()
                })
            }
            MessageType::AuthorizationReq => Response::Authorization(AuthorizationResponse {
                header,
                response_code: code,
                ..Default::default()
            }),
            MessageType::ServiceDiscoveryReq => {
                Response::ServiceDiscovery(ServiceDiscoveryResponse {
                    header,
                    response_code: code,
                    ..Default::default()
                })
            }
            MessageType::ServiceDetailReq => Response::ServiceDetail(ServiceDetailResponse {
                header,
                response_code: code,
                ..Default::default()
            }),
            MessageType::ServiceSelectionReq => {
                Response::ServiceSelection(ServiceSelectionResponse {
                    header,
                    response_code: code,
                })
            }
            MessageType::DcChargeParameterDiscoveryReq => {
                Response::DcChargeParameterDiscovery(DcChargeParameterDiscoveryResponse {
                    header,
                    response_code: code,
                    ..Default::default()
                })
            }
            MessageType::ScheduleExchangeReq => {
                Response::ScheduleExchange(ScheduleExchangeResponse {
                    header,
                    response_code: code,
                    ..Default::default()
                })
            }
            MessageType::DcCableCheckReq => Response::DcCableCheck(DcCableCheckResponse {
                header,
                response_code: code,
                ..Default::default()
            }),
            MessageType::DcPreChargeReq => Response::DcPreCharge(DcPreChargeResponse {
                header,
                response_code: code,
                ..Default::default()
            }),
            MessageType::PowerDeliveryReq => Response::PowerDelivery(PowerDeliveryResponse {
                header,
                response_code: code,
                status: None,
            }),
            MessageType::DcChargeLoopReq => Response::DcChargeLoop(DcChargeLoopResponse {
                header,
                response_code: code,
                ..Default::default()
            }),
            MessageType::DcWeldingDetectionReq => {
                Response::DcWeldingDetection(DcWeldingDetectionResponse {
                    header,
                    response_code: code,
                    ..Default::default()
                })
            }
            MessageType::SessionStopReq => Response::SessionStop(SessionStopResponse {
                header,
                response_code: code,
            }),
            _ => return None,
        };
        Some(res)
    }
}

macro_rules! impl_into_response {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Response {
                fn from(res: $ty) -> Self {
                    Response::$variant(res)
                }
            }
        )*
    };
}

impl_into_response! {
    SessionSetup => SessionSetupResponse,
    AuthorizationSetup => AuthorizationSetupResponse,
    Authorization => AuthorizationResponse,
    ServiceDiscovery => ServiceDiscoveryResponse,
    ServiceDetail => ServiceDetailResponse,
    ServiceSelection => ServiceSelectionResponse,
    DcChargeParameterDiscovery => DcChargeParameterDiscoveryResponse,
    ScheduleExchange => ScheduleExchangeResponse,
    DcCableCheck => DcCableCheckResponse,
    DcPreCharge => DcPreChargeResponse,
    PowerDelivery => PowerDeliveryResponse,
    DcChargeLoop => DcChargeLoopResponse,
    DcWeldingDetection => DcWeldingDetectionResponse,
    SessionStop => SessionStopResponse,
}
