//! Simulated charge controller
//!
//! Answers the state machine's feedback with control events: grants EIM
//! authorization, finishes the cable check after a delay, follows the
//! requested pre-charge voltage and closes the contactors.

use std::time::Duration;

use d20_core::control::{
    AuthorizationStatus, CableCheckFinished, ContactorClosed, ControlEvent, PauseCharging,
    PresentVoltageCurrent, StopCharging,
};
use d20_core::feedback::{ChargeLoopReq, FeedbackEvent, Signal};
use d20_core::message::MessageType;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Charger side interruption of the charge loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Stop,
    Pause,
}

#[derive(Debug, Clone)]
pub struct ChargerConfig {
    pub cable_check_delay: Duration,
    /// Interrupt after this many DC_ChargeLoopReq
    pub interrupt: Option<(Interrupt, u32)>,
    pub charge_current: f32,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            cable_check_delay: Duration::from_millis(300),
            interrupt: None,
            charge_current: 125.0,
        }
    }
}

pub struct Charger {
    control: mpsc::Sender<ControlEvent>,
    config: ChargerConfig,
    loops: u32,
    voltage: f32,
}

impl Charger {
    pub fn new(control: mpsc::Sender<ControlEvent>, config: ChargerConfig) -> Self {
        Self {
            control,
            config,
            loops: 0,
            voltage: 0.0,
        }
    }

    async fn send(&self, event: impl Into<ControlEvent>) {
        if self.control.send(event.into()).await.is_err() {
            debug!("Session gone, dropping control event");
        }
    }

    async fn report_present(&self, current: f32) {
        self.send(PresentVoltageCurrent {
            voltage: self.voltage,
            current,
        })
        .await;
    }

    /// Consume feedback until the session drops its sender
    pub async fn run(mut self, mut feedback: mpsc::UnboundedReceiver<FeedbackEvent>) {
        while let Some(event) = feedback.recv().await {
            match event {
                FeedbackEvent::Signal(signal) => self.on_signal(signal).await,
                FeedbackEvent::PreChargeTargetVoltage(voltage) => {
                    if (voltage - self.voltage).abs() > f32::EPSILON {
                        info!("Pre-charging to {:.1} V", voltage);
                    }
                    self.voltage = voltage;
                    self.report_present(0.0).await;
                    self.send(ContactorClosed(true)).await;
                }
                FeedbackEvent::ChargeLoopReq(ChargeLoopReq::DisplayParameters(display)) => {
                    if let Some(soc) = display.present_soc {
                        debug!("EV SoC {}%", soc);
                    }
                }
                FeedbackEvent::ChargeLoopReq(_) => {}
                FeedbackEvent::V2gMessage(MessageType::DcChargeLoopReq) => {
                    self.loops += 1;
                    self.report_present(self.config.charge_current).await;
                    self.check_interrupt().await;
                }
                FeedbackEvent::DcMaxLimits(limits) => {
                    info!(
                        "EV limits: {:.0} V, {:.0} A, {:.0} W",
                        limits.voltage, limits.current, limits.power
                    );
                }
                FeedbackEvent::EvccId(id) => info!("EVCC id {}", id),
                FeedbackEvent::SelectedProtocol(protocol) => debug!("Protocol {}", protocol),
                FeedbackEvent::EvTermination { code, explanation } => {
                    info!("EV termination {}: {}", code, explanation);
                }
                FeedbackEvent::ResponseCode(code) if code.is_failure() => {
                    warn!("Session answered with {}", code);
                }
                FeedbackEvent::ResponseCode(_) | FeedbackEvent::V2gMessage(_) => {}
            }
        }
        debug!("Charger done after {} charge loops", self.loops);
    }

    async fn on_signal(&mut self, signal: Signal) {
        match signal {
            Signal::RequireAuthEim => {
                info!("Authorizing EIM");
                self.send(AuthorizationStatus { authorized: true }).await;
            }
            Signal::StartCableCheck => {
                let control = self.control.clone();
                let delay = self.config.cable_check_delay;
                info!("Cable check ({:?})", delay);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if control.send(CableCheckFinished(true).into()).await.is_err() {
                        debug!("Session gone before the cable check finished");
                    }
                });
            }
            Signal::DcOpenContactor => {
                self.voltage = 0.0;
                self.send(ContactorClosed(false)).await;
                self.report_present(0.0).await;
            }
            Signal::DlinkTerminate | Signal::DlinkPause | Signal::DlinkError => {
                info!("Data link: {:?}", signal);
            }
            _ => {}
        }
    }

    async fn check_interrupt(&self) {
        let Some((interrupt, after)) = self.config.interrupt else {
            return;
        };
        if self.loops != after {
            return;
        }
        match interrupt {
            Interrupt::Stop => {
                info!("Stopping after {} charge loops", after);
                self.send(StopCharging(true)).await;
            }
            Interrupt::Pause => {
                info!("Pausing after {} charge loops", after);
                self.send(PauseCharging(true)).await;
            }
        }
    }
}
