//! Scripted EV
//!
//! Walks one DC session over JSON payloads, the way an EVCC would over
//! EXI: SessionSetup through WeldingDetection, then SessionStop.

use std::time::Duration;

use d20_core::codec::JsonCodec;
use d20_core::message::*;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub type EvResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Byte pipe between the EV and the EVSE relay
pub struct Link {
    pub tx: mpsc::Sender<Vec<u8>>,
    pub rx: mpsc::Receiver<Vec<u8>>,
}

/// How the EV left the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvEnd {
    Terminated,
    Paused,
}

pub struct SimulatedEv {
    codec: JsonCodec,
    evcc_id: String,
    session_id: SessionId,
    charge_loops: u32,
    poll_interval: Duration,
    target_voltage: i16,
}

impl SimulatedEv {
    pub fn new(evcc_id: impl Into<String>, charge_loops: u32) -> Self {
        Self {
            codec: JsonCodec,
            evcc_id: evcc_id.into(),
            session_id: SessionId::default(),
            charge_loops,
            poll_interval: Duration::from_millis(100),
            target_voltage: 400,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    fn header(&self) -> Header {
        Header::new(self.session_id)
    }

    async fn exchange(&self, link: &mut Link, request: Request) -> EvResult<Response> {
        debug!("EV -> {}", request.message_type());
        let bytes = self.codec.encode_request(&request)?;
        link.tx
            .send(bytes)
            .await
            .map_err(|_| "EVSE closed the connection")?;

        let bytes = link.rx.recv().await.ok_or("EVSE closed the connection")?;
        let response = self.codec.decode_response(&bytes)?;
        debug!("EV <- {} ({})", response.message_type(), response.response_code());

        if response.response_code().is_failure() {
            return Err(format!(
                "{} answered with {}",
                response.message_type(),
                response.response_code()
            )
            .into());
        }
        Ok(response)
    }

    /// Run one session on `link`. With `resume` the EV rejoins its paused session.
    pub async fn run_session(&mut self, link: &mut Link, resume: bool) -> EvResult<EvEnd> {
        let res = self
            .exchange(
                link,
                Request::SessionSetup(SessionSetupRequest {
                    header: self.header(),
                    evccid: self.evcc_id.clone(),
                }),
            )
            .await?;
        let joined = res.response_code() == ResponseCode::OkOldSessionJoined;
        if resume && !joined {
            warn!("EVSE did not join the paused session, starting over");
        }
        self.session_id = res.header().session_id;
        info!("EV session {} ({})", self.session_id, res.response_code());

        self.exchange(
            link,
            Request::AuthorizationSetup(AuthorizationSetupRequest {
                header: self.header(),
            }),
        )
        .await?;
        self.authorize(link).await?;

        if !joined {
            self.negotiate_service(link).await?;
        }

        self.exchange(link, self.charge_parameter_discovery()).await?;
        self.schedule_exchange(link).await?;
        self.cable_check(link).await?;
        self.pre_charge(link).await?;

        self.power_delivery(link, Progress::Start).await?;
        let end = self.charge_loop(link).await?;
        self.power_delivery(link, Progress::Stop).await?;

        self.welding_detection(link).await?;

        let charging_session = match end {
            EvEnd::Terminated => ChargingSession::Terminate,
            EvEnd::Paused => ChargingSession::Pause,
        };
        self.exchange(
            link,
            Request::SessionStop(SessionStopRequest {
                header: self.header(),
                charging_session,
                ev_termination_code: None,
                ev_termination_explanation: None,
            }),
        )
        .await?;

        info!("EV left session {}: {:?}", self.session_id, end);
        Ok(end)
    }

    async fn authorize(&self, link: &mut Link) -> EvResult<()> {
        loop {
            let res = self
                .exchange(
                    link,
                    Request::Authorization(AuthorizationRequest {
                        header: self.header(),
                        selected_authorization_service: Authorization::Eim,
                        gen_challenge: None,
                    }),
                )
                .await?;
            match res {
                Response::Authorization(res) if res.evse_processing == Processing::Finished => {
                    if res.response_code != ResponseCode::Ok {
                        return Err(format!("authorization refused: {}", res.response_code).into());
                    }
                    return Ok(());
                }
                _ => sleep(self.poll_interval).await,
            }
        }
    }

    async fn negotiate_service(&self, link: &mut Link) -> EvResult<()> {
        let res = self
            .exchange(
                link,
                Request::ServiceDiscovery(ServiceDiscoveryRequest {
                    header: self.header(),
                    supported_service_ids: Some(vec![ServiceCategory::Dc.id()]),
                }),
            )
            .await?;
        let Response::ServiceDiscovery(res) = res else {
            return Err("expected ServiceDiscoveryRes".into());
        };
        if !res
            .energy_transfer_service_list
            .iter()
            .any(|service| service.service_id == ServiceCategory::Dc)
        {
            return Err("EVSE does not offer DC".into());
        }

        let res = self
            .exchange(
                link,
                Request::ServiceDetail(ServiceDetailRequest {
                    header: self.header(),
                    service: ServiceCategory::Dc,
                }),
            )
            .await?;
        let Response::ServiceDetail(res) = res else {
            return Err("expected ServiceDetailRes".into());
        };
        let set = res
            .service_parameter_list
            .first()
            .ok_or("no DC parameter set offered")?;

        self.exchange(
            link,
            Request::ServiceSelection(ServiceSelectionRequest {
                header: self.header(),
                selected_energy_transfer_service: SelectedService {
                    service_id: ServiceCategory::Dc,
                    parameter_set_id: set.id,
                },
            }),
        )
        .await?;
        Ok(())
    }

    fn charge_parameter_discovery(&self) -> Request {
        Request::DcChargeParameterDiscovery(DcChargeParameterDiscoveryRequest {
            header: self.header(),
            transfer_mode: DcCpdReqTransferMode::Dc(DcCpdReqParams {
                max_charge_power: RationalNumber::new(150, 3),
                min_charge_power: RationalNumber::new(0, 0),
                max_charge_current: RationalNumber::new(350, 0),
                min_charge_current: RationalNumber::new(0, 0),
                max_voltage: RationalNumber::new(850, 0),
                min_voltage: RationalNumber::new(200, 0),
                target_soc: Some(80),
            }),
        })
    }

    async fn schedule_exchange(&self, link: &mut Link) -> EvResult<()> {
        loop {
            let res = self
                .exchange(
                    link,
                    Request::ScheduleExchange(ScheduleExchangeRequest {
                        header: self.header(),
                        max_supporting_points: 1024,
                        control_mode: ScheduleExchangeReqControlMode::Scheduled(
                            ScheduledSeReqParams::default(),
                        ),
                    }),
                )
                .await?;
            if let Response::ScheduleExchange(res) = res {
                if res.processing == Processing::Finished {
                    return Ok(());
                }
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn cable_check(&self, link: &mut Link) -> EvResult<()> {
        loop {
            let res = self
                .exchange(
                    link,
                    Request::DcCableCheck(DcCableCheckRequest {
                        header: self.header(),
                    }),
                )
                .await?;
            if let Response::DcCableCheck(res) = res {
                if res.processing == Processing::Finished {
                    return Ok(());
                }
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn pre_charge(&self, link: &mut Link) -> EvResult<()> {
        let target = RationalNumber::new(self.target_voltage, 0);
        let mut present = RationalNumber::new(0, 0);
        loop {
            let res = self
                .exchange(
                    link,
                    Request::DcPreCharge(DcPreChargeRequest {
                        header: self.header(),
                        processing: Processing::Ongoing,
                        present_voltage: present,
                        target_voltage: target,
                    }),
                )
                .await?;
            if let Response::DcPreCharge(res) = res {
                present = res.present_voltage;
            }
            if (present.to_float() - target.to_float()).abs() < 10.0 {
                info!("EV pre-charged to {:.1} V", present.to_float());
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn power_delivery(&self, link: &mut Link, charge_progress: Progress) -> EvResult<()> {
        self.exchange(
            link,
            Request::PowerDelivery(PowerDeliveryRequest {
                header: self.header(),
                processing: Processing::Finished,
                charge_progress,
            }),
        )
        .await?;
        Ok(())
    }

    /// Charge until the configured loop count or an EVSE notification
    async fn charge_loop(&self, link: &mut Link) -> EvResult<EvEnd> {
        for round in 0..self.charge_loops {
            let soc = 20 + (round.min(60) as i8);
            let res = self
                .exchange(
                    link,
                    Request::DcChargeLoop(DcChargeLoopRequest {
                        header: self.header(),
                        display_parameters: Some(DisplayParameters {
                            present_soc: Some(soc),
                            target_soc: Some(80),
                            ..Default::default()
                        }),
                        meter_info_requested: false,
                        present_voltage: RationalNumber::new(self.target_voltage, 0),
                        control_mode: DcChargeLoopReqControlMode::Scheduled(ScheduledDcClReq {
                            target_current: RationalNumber::new(125, 0),
                            target_voltage: RationalNumber::new(self.target_voltage, 0),
                            ..Default::default()
                        }),
                    }),
                )
                .await?;

            if let Response::DcChargeLoop(res) = res {
                match res.status.map(|status| status.notification) {
                    Some(EvseNotification::Terminate) => {
                        info!("EVSE asked to stop charging");
                        return Ok(EvEnd::Terminated);
                    }
                    Some(EvseNotification::Pause) => {
                        info!("EVSE asked to pause");
                        return Ok(EvEnd::Paused);
                    }
                    _ => {}
                }
            }
            sleep(self.poll_interval).await;
        }
        Ok(EvEnd::Terminated)
    }

    async fn welding_detection(&self, link: &mut Link) -> EvResult<()> {
        for processing in [Processing::Ongoing, Processing::Finished] {
            self.exchange(
                link,
                Request::DcWeldingDetection(DcWeldingDetectionRequest {
                    header: self.header(),
                    processing,
                }),
            )
            .await?;
        }
        Ok(())
    }
}
