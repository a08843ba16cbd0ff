//! Request builders shared by the integration tests

#![allow(dead_code)]

use d20_core::feedback::FeedbackEvent;
use d20_core::message::*;
use tokio::sync::mpsc;

/// EV side of a session: remembers the session id and stamps headers
pub struct Ev {
    pub session_id: SessionId,
}

impl Ev {
    pub fn new() -> Self {
        Self {
            session_id: SessionId::default(),
        }
    }

    pub fn header(&self) -> Header {
        Header {
            session_id: self.session_id,
            timestamp: 0,
        }
    }

    pub fn session_setup(&self) -> Request {
        Request::SessionSetup(SessionSetupRequest {
            header: self.header(),
            evccid: "WMIV1234567890ABCDEX".to_string(),
        })
    }

    pub fn authorization_setup(&self) -> Request {
        Request::AuthorizationSetup(AuthorizationSetupRequest {
            header: self.header(),
        })
    }

    pub fn authorization(&self) -> Request {
        Request::Authorization(AuthorizationRequest {
            header: self.header(),
            selected_authorization_service: Authorization::Eim,
            gen_challenge: None,
        })
    }

    pub fn service_discovery(&self) -> Request {
        Request::ServiceDiscovery(ServiceDiscoveryRequest {
            header: self.header(),
            supported_service_ids: None,
        })
    }

    pub fn service_detail(&self, service: ServiceCategory) -> Request {
        Request::ServiceDetail(ServiceDetailRequest {
            header: self.header(),
            service,
        })
    }

    pub fn service_selection(&self, service: ServiceCategory, parameter_set_id: u16) -> Request {
        Request::ServiceSelection(ServiceSelectionRequest {
            header: self.header(),
            selected_energy_transfer_service: SelectedService {
                service_id: service,
                parameter_set_id,
            },
        })
    }

    pub fn charge_parameter_discovery(&self) -> Request {
        Request::DcChargeParameterDiscovery(DcChargeParameterDiscoveryRequest {
            header: self.header(),
            transfer_mode: DcCpdReqTransferMode::Dc(DcCpdReqParams {
                max_charge_power: RationalNumber::new(150, 3),
                min_charge_power: RationalNumber::new(0, 0),
                max_charge_current: RationalNumber::new(300, 0),
                min_charge_current: RationalNumber::new(0, 0),
                max_voltage: RationalNumber::new(900, 0),
                min_voltage: RationalNumber::new(150, 0),
                target_soc: Some(80),
            }),
        })
    }

    pub fn schedule_exchange(&self) -> Request {
        Request::ScheduleExchange(ScheduleExchangeRequest {
            header: self.header(),
            max_supporting_points: 1024,
            control_mode: ScheduleExchangeReqControlMode::Scheduled(ScheduledSeReqParams::default()),
        })
    }

    pub fn cable_check(&self) -> Request {
        Request::DcCableCheck(DcCableCheckRequest {
            header: self.header(),
        })
    }

    pub fn pre_charge(&self, target_voltage: i16) -> Request {
        Request::DcPreCharge(DcPreChargeRequest {
            header: self.header(),
            processing: Processing::Ongoing,
            present_voltage: RationalNumber::new(target_voltage, 0),
            target_voltage: RationalNumber::new(target_voltage, 0),
        })
    }

    pub fn power_delivery(&self, charge_progress: Progress) -> Request {
        Request::PowerDelivery(PowerDeliveryRequest {
            header: self.header(),
            processing: Processing::Finished,
            charge_progress,
        })
    }

    pub fn charge_loop(&self) -> Request {
        Request::DcChargeLoop(DcChargeLoopRequest {
            header: self.header(),
            display_parameters: Some(DisplayParameters {
                present_soc: Some(42),
                ..Default::default()
            }),
            meter_info_requested: false,
            present_voltage: RationalNumber::new(400, 0),
            control_mode: DcChargeLoopReqControlMode::Scheduled(ScheduledDcClReq {
                target_current: RationalNumber::new(100, 0),
                target_voltage: RationalNumber::new(400, 0),
                ..Default::default()
            }),
        })
    }

    pub fn welding_detection(&self, processing: Processing) -> Request {
        Request::DcWeldingDetection(DcWeldingDetectionRequest {
            header: self.header(),
            processing,
        })
    }

    pub fn session_stop(&self, charging_session: ChargingSession) -> Request {
        Request::SessionStop(SessionStopRequest {
            header: self.header(),
            charging_session,
            ev_termination_code: None,
            ev_termination_explanation: None,
        })
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<FeedbackEvent>) -> Vec<FeedbackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
