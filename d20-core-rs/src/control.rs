//! Control events from the charge controller
//!
//! Out-of-band inputs (measurements, cable check result, stop/pause
//! requests, contactor state). They never produce a response; each state
//! picks the payloads it cares about through [`ControlPayload`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresentVoltageCurrent {
    pub voltage: f32,
    pub current: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableCheckFinished(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCharging(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseCharging(pub bool);

/// Result of EIM (or contract) authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationStatus {
    pub authorized: bool,
}

/// Values the SECC provides in dynamic mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDynamicModeParameters {
    /// Unix time in seconds
    pub departure_time: Option<u64>,
    pub target_soc: Option<i8>,
    pub min_soc: Option<i8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactorClosed(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactorFault(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlEvent {
    PresentVoltageCurrent(PresentVoltageCurrent),
    CableCheckFinished(CableCheckFinished),
    StopCharging(StopCharging),
    PauseCharging(PauseCharging),
    Authorization(AuthorizationStatus),
    UpdateDynamicModeParameters(UpdateDynamicModeParameters),
    ContactorClosed(ContactorClosed),
    ContactorFault(ContactorFault),
}

impl ControlEvent {
    /// Measurement samples may be coalesced, everything else must be delivered
    pub fn is_sample(&self) -> bool {
        matches!(self, ControlEvent::PresentVoltageCurrent(_))
    }
}

/// Typed view on a [`ControlEvent`]
pub trait ControlPayload: Sized {
    fn from_event(event: &ControlEvent) -> Option<Self>;
}

macro_rules! control_payload {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl ControlPayload for $ty {
                fn from_event(event: &ControlEvent) -> Option<Self> {
                    match event {
                        ControlEvent::$variant(payload) => Some(*payload),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for ControlEvent {
                fn from(payload: $ty) -> Self {
                    ControlEvent::$variant(payload)
                }
            }
        )*
    };
}

control_payload! {
    PresentVoltageCurrent => PresentVoltageCurrent,
    CableCheckFinished => CableCheckFinished,
    StopCharging => StopCharging,
    PauseCharging => PauseCharging,
    Authorization => AuthorizationStatus,
    UpdateDynamicModeParameters => UpdateDynamicModeParameters,
    ContactorClosed => ContactorClosed,
    ContactorFault => ContactorFault,
}

/// Drop voltage/current samples that are directly superseded by a newer one
pub fn coalesce(events: Vec<ControlEvent>) -> Vec<ControlEvent> {
    let mut out: Vec<ControlEvent> = Vec::with_capacity(events.len());
    for event in events {
        if event.is_sample() {
            if let Some(last) = out.last_mut() {
                if last.is_sample() {
                    *last = event;
                    continue;
                }
            }
        }
        out.push(event);
    }
    out
}
