//! Feedback towards the charge controller
//!
//! One-way notifications out of the state machine. The controller answers
//! only through later control events, never through a return value.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::{
    DcChargeLoopReqControlMode, DisplayParameters, MessageType, ResponseCode,
};

/// Discrete signals raised by the states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    RequireAuthEim,
    StartCableCheck,
    PreChargeStarted,
    SetupFinished,
    ChargeLoopStarted,
    ChargeLoopFinished,
    DcOpenContactor,
    DlinkTerminate,
    DlinkError,
    DlinkPause,
}

/// EV maximum limits reported in DC_ChargeParameterDiscoveryReq
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcMaximumLimits {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
}

/// Parts of DC_ChargeLoopReq forwarded to the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChargeLoopReq {
    ControlMode(DcChargeLoopReqControlMode),
    PresentVoltage(f32),
    MeterInfoRequested(bool),
    DisplayParameters(DisplayParameters),
}

/// Sink for state machine feedback. All methods default to no-ops.
pub trait Feedback: Send {
    fn signal(&mut self, _signal: Signal) {}
    fn dc_pre_charge_target_voltage(&mut self, _voltage: f32) {}
    fn dc_charge_loop_req(&mut self, _req: ChargeLoopReq) {}
    fn dc_max_limits(&mut self, _limits: DcMaximumLimits) {}
    fn v2g_message(&mut self, _message: MessageType) {}
    fn evcc_id(&mut self, _id: &str) {}
    fn selected_protocol(&mut self, _protocol: &str) {}
    fn response_code(&mut self, _code: ResponseCode) {}
    fn ev_termination(&mut self, _code: &str, _explanation: &str) {}
}

/// Feedback that goes nowhere
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {}

/// Feedback as a value, for channels and recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeedbackEvent {
    Signal(Signal),
    PreChargeTargetVoltage(f32),
    ChargeLoopReq(ChargeLoopReq),
    DcMaxLimits(DcMaximumLimits),
    V2gMessage(MessageType),
    EvccId(String),
    SelectedProtocol(String),
    ResponseCode(ResponseCode),
    EvTermination { code: String, explanation: String },
}

/// Forwards feedback over an unbounded channel; never blocks
#[derive(Debug, Clone)]
pub struct ChannelFeedback {
    tx: mpsc::UnboundedSender<FeedbackEvent>,
}

impl ChannelFeedback {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FeedbackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: FeedbackEvent) {
        if self.tx.send(event).is_err() {
            debug!("Feedback receiver dropped");
        }
    }
}

impl Feedback for ChannelFeedback {
    fn signal(&mut self, signal: Signal) {
        info!("Signal: {:?}", signal);
        self.send(FeedbackEvent::Signal(signal));
    }

    fn dc_pre_charge_target_voltage(&mut self, voltage: f32) {
        self.send(FeedbackEvent::PreChargeTargetVoltage(voltage));
    }

    fn dc_charge_loop_req(&mut self, req: ChargeLoopReq) {
        self.send(FeedbackEvent::ChargeLoopReq(req));
    }

    fn dc_max_limits(&mut self, limits: DcMaximumLimits) {
        self.send(FeedbackEvent::DcMaxLimits(limits));
    }

    fn v2g_message(&mut self, message: MessageType) {
        self.send(FeedbackEvent::V2gMessage(message));
    }

    fn evcc_id(&mut self, id: &str) {
        self.send(FeedbackEvent::EvccId(id.to_string()));
    }

    fn selected_protocol(&mut self, protocol: &str) {
        self.send(FeedbackEvent::SelectedProtocol(protocol.to_string()));
    }

    fn response_code(&mut self, code: ResponseCode) {
        self.send(FeedbackEvent::ResponseCode(code));
    }

    fn ev_termination(&mut self, code: &str, explanation: &str) {
        self.send(FeedbackEvent::EvTermination {
            code: code.to_string(),
            explanation: explanation.to_string(),
        });
    }
}
