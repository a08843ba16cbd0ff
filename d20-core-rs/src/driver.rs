//! Session driver
//!
//! Owns the active [`State`], the [`Context`] and the [`Timeouts`] of one
//! V2G connection and feeds them one event at a time.
//!
//! Two ways to drive it:
//! - synchronously through [`SessionDriver::handle_message`],
//!   [`SessionDriver::handle_control`] and [`SessionDriver::poll_timeouts`]
//! - as a tokio task with [`SessionDriver::run`], fed through the bounded
//!   channels of [`session_channel`]
//!
//! Timeout policy:
//! - `Sequence` restarts after every response while the session is alive
//! - `Performance` runs while in DC_CableCheck and DC_PreCharge
//! - `Contactor` runs from PowerDelivery entry until the charger reports
//!   closed contactors

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::codec::MessageCodec;
use crate::config::{DriverConfig, EvseSetupConfig, SessionConfig};
use crate::context::{Context, PauseContext};
use crate::control::{coalesce, ContactorClosed, ContactorFault, ControlEvent};
use crate::error::DriverError;
use crate::feedback::{Feedback, Signal};
use crate::message::{Request, Response};
use crate::session::SessionIdGenerator;
use crate::state::{Event, State, Transition};
use crate::timeouts::{TimeoutType, Timeouts};

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// EV terminated the session
    Terminated,
    /// EV paused; pass the context to [`SessionDriver::resume`] for the next connection
    Paused(PauseContext),
    /// Failure response, sequence error or timeout
    Failed,
    /// Transport went away before the session ended
    ConnectionClosed,
}

pub struct SessionDriver {
    state: State,
    ctx: Context,
    timeouts: Timeouts,
    config: DriverConfig,
    contactors_closed: bool,
    failed: bool,
}

impl SessionDriver {
    pub fn new(setup: &EvseSetupConfig, feedback: Box<dyn Feedback>, config: DriverConfig) -> Self {
        let mut ctx = Context::new(SessionConfig::new(setup), feedback);
        if config.pause_resume_supported {
            ctx.pause_ctx = Some(PauseContext::default());
        }

        let mut state = State::initial();
        state.enter(&mut ctx);

        Self {
            state,
            ctx,
            timeouts: Timeouts::new(),
            config,
            contactors_closed: false,
            failed: false,
        }
    }

    /// New connection that may rejoin the paused session in `pause_ctx`
    pub fn resume(
        pause_ctx: PauseContext,
        setup: &EvseSetupConfig,
        feedback: Box<dyn Feedback>,
        config: DriverConfig,
    ) -> Self {
        let mut driver = Self::new(setup, feedback, config);
        driver.ctx.pause_ctx = Some(pause_ctx);
        driver
    }

    pub fn with_id_generator(mut self, generator: Box<dyn SessionIdGenerator>) -> Self {
        self.ctx = self.ctx.with_id_generator(generator);
        self
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// `None` while the session is alive
    pub fn outcome(&self) -> Option<SessionOutcome> {
        if self.failed {
            Some(SessionOutcome::Failed)
        } else if self.ctx.session_paused {
            Some(SessionOutcome::Paused(
                self.ctx.pause_ctx.clone().unwrap_or_default(),
            ))
        } else if self.ctx.session_stopped {
            Some(SessionOutcome::Terminated)
        } else {
            None
        }
    }

    fn finished(&self) -> bool {
        self.ctx.session_stopped || self.ctx.session_paused
    }

    pub fn handle_message(&mut self, request: Request) -> Option<Response> {
        self.handle_message_at(request, Instant::now())
    }

    /// Feed one request; returns the response to send
    pub fn handle_message_at(&mut self, request: Request, now: Instant) -> Option<Response> {
        let req_type = request.message_type();
        self.timeouts.stop_timeout(TimeoutType::Sequence);

        let transition = self.state.feed(Event::Message(request), &mut self.ctx);
        self.apply(transition, now);

        let response = self.ctx.take_response();
        match &response {
            Some(res) if res.response_code().is_failure() => {
                warn!("{} answered with {}", req_type, res.response_code());
                self.failed = true;
            }
            Some(_) => {}
            None => error!("{} in {} produced no response", req_type, self.state.name()),
        }

        if self.finished() {
            self.timeouts = Timeouts::new();
        } else {
            self.timeouts
                .start_timeout_at(TimeoutType::Sequence, self.config.sequence_timeout, now);
        }
        response
    }

    /// Feed one control event; never produces a response
    pub fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::ContactorClosed(ContactorClosed(closed)) => {
                self.contactors_closed = closed;
                if closed {
                    self.timeouts.stop_timeout(TimeoutType::Contactor);
                }
            }
            ControlEvent::ContactorFault(ContactorFault(fault)) => {
                if fault {
                    warn!("Contactor fault reported in {}", self.state.name());
                }
                self.ctx.contactor_fault = fault;
            }
            _ => {}
        }

        let transition = self.state.feed(Event::Control(event), &mut self.ctx);
        self.apply(transition, Instant::now());
    }

    pub fn poll_timeouts(&mut self) {
        self.poll_timeouts_at(Instant::now());
    }

    pub fn poll_timeouts_at(&mut self, now: Instant) {
        let Some(elapsed) = self.timeouts.check_at(now) else {
            return;
        };

        for timeout in elapsed {
            self.timeouts.reset_timeout(timeout);
            match timeout {
                TimeoutType::Contactor => {
                    warn!("Contactors did not close in time");
                    self.ctx.contactor_fault = true;
                }
                TimeoutType::Performance | TimeoutType::Sequence => {
                    warn!("{:?} timeout in {}", timeout, self.state.name());
                    self.fail();
                }
            }
        }
    }

    fn fail(&mut self) {
        if self.failed && matches!(self.state, State::Failed) {
            return;
        }
        self.state = State::Failed;
        self.state.enter(&mut self.ctx);
        self.timeouts = Timeouts::new();
        self.ctx.session_stopped = true;
        self.ctx.feedback.signal(Signal::DlinkError);
        self.failed = true;
    }

    fn apply(&mut self, transition: Transition, now: Instant) {
        let Transition::To(mut next) = transition else {
            return;
        };

        let from_pre_charge = matches!(self.state, State::DcPreCharge(_));
        if matches!(self.state, State::DcCableCheck(_) | State::DcPreCharge(_)) {
            self.timeouts.stop_timeout(TimeoutType::Performance);
        }

        match &next {
            State::DcCableCheck(_) => self.timeouts.start_timeout_at(
                TimeoutType::Performance,
                self.config.cable_check_timeout,
                now,
            ),
            State::DcPreCharge(_) => self.timeouts.start_timeout_at(
                TimeoutType::Performance,
                self.config.pre_charge_timeout,
                now,
            ),
            State::PowerDelivery(_) if from_pre_charge && !self.contactors_closed => self
                .timeouts
                .start_timeout_at(TimeoutType::Contactor, self.config.contactor_timeout, now),
            _ => {}
        }

        debug!("{} -> {}", self.state.name(), next.name());
        next.enter(&mut self.ctx);
        self.state = next;
    }

    /// Drive the session from channels until it ends.
    ///
    /// Control events are served before requests; consecutive voltage
    /// samples are coalesced. Timeouts are polled every tick.
    pub async fn run(mut self, mut channels: SessionChannels) -> Result<SessionOutcome, DriverError> {
        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut control_open = true;

        info!("Session driver started");

        loop {
            if let Some(outcome) = self.outcome() {
                info!("Session ended in {}: {:?}", self.state.name(), outcome);
                return Ok(outcome);
            }

            tokio::select! {
                biased;

                event = channels.control.recv(), if control_open => match event {
                    Some(event) => {
                        let mut batch = vec![event];
                        while let Ok(next) = channels.control.try_recv() {
                            batch.push(next);
                        }
                        for event in coalesce(batch) {
                            self.handle_control(event);
                        }
                    }
                    None => {
                        debug!("Control channel closed");
                        control_open = false;
                    }
                },

                request = channels.requests.recv() => match request {
                    Some(request) => {
                        if let Some(response) = self.handle_message(request) {
                            channels
                                .responses
                                .send(response)
                                .await
                                .map_err(|_| DriverError::ResponseChannelClosed)?;
                        }
                    }
                    None => {
                        info!("Connection closed in {}", self.state.name());
                        return Ok(SessionOutcome::ConnectionClosed);
                    }
                },

                _ = tick.tick() => self.poll_timeouts(),
            }
        }
    }
}

impl std::fmt::Debug for SessionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDriver")
            .field("state", &self.state.name())
            .field("ctx", &self.ctx)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

/// Transport side of a session
#[derive(Debug)]
pub struct SessionHandle {
    pub requests: mpsc::Sender<Request>,
    pub control: mpsc::Sender<ControlEvent>,
    pub responses: mpsc::Receiver<Response>,
}

/// Driver side of a session, consumed by [`SessionDriver::run`]
#[derive(Debug)]
pub struct SessionChannels {
    requests: mpsc::Receiver<Request>,
    control: mpsc::Receiver<ControlEvent>,
    responses: mpsc::Sender<Response>,
}

/// Bounded channels between a transport and a driver
pub fn session_channel(config: &DriverConfig) -> (SessionHandle, SessionChannels) {
    let (request_tx, request_rx) = mpsc::channel(config.request_channel_capacity);
    let (control_tx, control_rx) = mpsc::channel(config.control_channel_capacity);
    // strictly request/response, one in flight
    let (response_tx, response_rx) = mpsc::channel(1);

    (
        SessionHandle {
            requests: request_tx,
            control: control_tx,
            responses: response_rx,
        },
        SessionChannels {
            requests: request_rx,
            control: control_rx,
            responses: response_tx,
        },
    )
}

impl SessionHandle {
    /// Send one request and wait for its response
    pub async fn exchange(&mut self, request: Request) -> Option<Response> {
        self.requests.send(request).await.ok()?;
        self.responses.recv().await
    }

    /// Relay encoded payloads between a byte transport and the driver.
    ///
    /// Returns once either side closes. A payload that fails to decode ends
    /// the connection with [`DriverError::Codec`].
    pub async fn relay<C: MessageCodec>(
        &mut self,
        codec: &C,
        mut inbound: mpsc::Receiver<Vec<u8>>,
        outbound: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), DriverError> {
        while let Some(bytes) = inbound.recv().await {
            let request = codec.decode(&bytes)?;
            let Some(response) = self.exchange(request).await else {
                debug!("Driver gone, closing relay");
                return Ok(());
            };
            let bytes = codec.encode(&response)?;
            if outbound.send(bytes).await.is_err() {
                return Err(DriverError::ResponseChannelClosed);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{CableCheckFinished, PresentVoltageCurrent};
    use crate::feedback::{ChannelFeedback, FeedbackEvent};
    use crate::message::{
        DcCableCheckRequest, DcPreChargeRequest, Header, PowerDeliveryRequest, Progress,
        RationalNumber, ResponseCode, SessionId, SessionSetupRequest,
    };
    use crate::session::SequentialIdGenerator;
    use std::time::Duration;

    const SESSION: SessionId = SessionId([0, 0, 0, 0, 0, 0, 0, 1]);

    fn driver() -> (SessionDriver, mpsc::UnboundedReceiver<FeedbackEvent>) {
        let (feedback, rx) = ChannelFeedback::new();
        let driver = SessionDriver::new(
            &EvseSetupConfig::default(),
            Box::new(feedback),
            DriverConfig::default(),
        )
        .with_id_generator(Box::new(SequentialIdGenerator::new(1)));
        (driver, rx)
    }

    fn header() -> Header {
        Header {
            session_id: SESSION,
            timestamp: 0,
        }
    }

    fn setup(driver: &mut SessionDriver, now: Instant) {
        let res = driver.handle_message_at(
            Request::SessionSetup(SessionSetupRequest {
                header: Header::default(),
                evccid: "EVCC".to_string(),
            }),
            now,
        );
        assert_eq!(
            res.unwrap().response_code(),
            ResponseCode::OkNewSessionEstablished
        );
    }

    #[test]
    fn test_sequence_timeout_fails_session() {
        let (mut driver, mut rx) = driver();
        let start = Instant::now();
        setup(&mut driver, start);

        assert!(driver.timeouts().is_running(TimeoutType::Sequence));
        driver.poll_timeouts_at(start + Duration::from_secs(59));
        assert!(driver.outcome().is_none());

        driver.poll_timeouts_at(start + Duration::from_secs(60));
        assert_eq!(driver.outcome(), Some(SessionOutcome::Failed));
        assert_eq!(driver.state_name(), "Failed");

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.contains(&FeedbackEvent::Signal(Signal::DlinkError)));
    }

    #[test]
    fn test_failed_state_answers_sequence_error() {
        let (mut driver, _rx) = driver();
        let start = Instant::now();
        setup(&mut driver, start);
        driver.poll_timeouts_at(start + Duration::from_secs(61));

        let res = driver
            .handle_message(Request::SessionStop(Default::default()))
            .unwrap();
        assert_eq!(res.response_code(), ResponseCode::FailedSequenceError);
    }

    #[test]
    fn test_performance_timeout_in_cable_check() {
        let (mut driver, _rx) = driver();
        let start = Instant::now();
        driver.state = State::DcCableCheck(Default::default());
        driver.ctx.start_new_session();

        let res = driver.handle_message_at(
            Request::DcCableCheck(DcCableCheckRequest { header: header() }),
            start,
        );
        assert_eq!(res.unwrap().response_code(), ResponseCode::Ok);

        // performance timeout only starts on entry
        assert!(!driver.timeouts().is_running(TimeoutType::Performance));
        driver.apply(Transition::to(crate::state::DcCableCheck::default()), start);
        assert!(driver.timeouts().is_running(TimeoutType::Performance));

        driver.poll_timeouts_at(start + Duration::from_secs(40));
        assert_eq!(driver.outcome(), Some(SessionOutcome::Failed));
    }

    #[test]
    fn test_contactor_timeout_sets_fault() {
        let (mut driver, _rx) = driver();
        let start = Instant::now();
        driver.ctx.start_new_session();
        driver.state = State::DcPreCharge(Default::default());

        let res = driver.handle_message_at(
            Request::DcPreCharge(DcPreChargeRequest {
                header: header(),
                target_voltage: RationalNumber::new(400, 0),
                ..Default::default()
            }),
            start,
        );
        assert_eq!(res.unwrap().response_code(), ResponseCode::Ok);
        assert_eq!(driver.state_name(), "PowerDelivery");
        assert!(driver.timeouts().is_running(TimeoutType::Contactor));

        driver.poll_timeouts_at(start + Duration::from_secs(5));
        assert!(driver.context().contactor_fault);
        assert!(driver.outcome().is_none());

        let res = driver.handle_message_at(
            Request::PowerDelivery(PowerDeliveryRequest {
                header: header(),
                charge_progress: Progress::Start,
                ..Default::default()
            }),
            start + Duration::from_secs(6),
        );
        assert_eq!(res.unwrap().response_code(), ResponseCode::FailedContactorError);
        assert_eq!(driver.outcome(), Some(SessionOutcome::Failed));
    }

    #[test]
    fn test_contactor_closed_stops_timeout() {
        let (mut driver, _rx) = driver();
        let start = Instant::now();
        driver.ctx.start_new_session();
        driver.state = State::DcPreCharge(Default::default());

        driver.handle_message_at(
            Request::DcPreCharge(DcPreChargeRequest {
                header: header(),
                ..Default::default()
            }),
            start,
        );
        driver.handle_control(ContactorClosed(true).into());

        assert!(!driver.timeouts().is_running(TimeoutType::Contactor));
        driver.poll_timeouts_at(start + Duration::from_secs(10));
        assert!(!driver.context().contactor_fault);
    }

    #[test]
    fn test_contactor_closed_before_power_delivery() {
        let (mut driver, _rx) = driver();
        driver.ctx.start_new_session();
        driver.state = State::DcPreCharge(Default::default());

        driver.handle_control(ContactorClosed(true).into());
        driver.handle_message(Request::DcPreCharge(DcPreChargeRequest {
            header: header(),
            ..Default::default()
        }));

        assert_eq!(driver.state_name(), "PowerDelivery");
        assert!(!driver.timeouts().is_running(TimeoutType::Contactor));
    }

    #[tokio::test]
    async fn test_run_until_connection_closed() {
        let (feedback, _rx) = ChannelFeedback::new();
        let config = DriverConfig::default().with_tick_interval(Duration::from_millis(5));
        let driver = SessionDriver::new(&EvseSetupConfig::default(), Box::new(feedback), config.clone())
            .with_id_generator(Box::new(SequentialIdGenerator::new(1)));
        let (mut handle, channels) = session_channel(&config);

        let task = tokio::spawn(driver.run(channels));

        let res = handle
            .exchange(Request::SessionSetup(SessionSetupRequest::default()))
            .await
            .unwrap();
        assert_eq!(res.response_code(), ResponseCode::OkNewSessionEstablished);

        handle
            .control
            .send(
                PresentVoltageCurrent {
                    voltage: 10.0,
                    current: 0.0,
                }
                .into(),
            )
            .await
            .unwrap();
        handle
            .control
            .send(CableCheckFinished(true).into())
            .await
            .unwrap();

        drop(handle);
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, SessionOutcome::ConnectionClosed);
    }
}
