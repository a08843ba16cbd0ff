//! ISO 15118-20 common datatypes
//!
//! Shared building blocks of the V2G message set:
//! - Session identifier and message header
//! - Response codes (ordered, `>= Failed` ends the session)
//! - Rational numbers used for every physical value
//! - Service, processing and progress enumerations

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Header
// ============================================================================

/// 8 byte session identifier, compared byte-for-byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub [u8; 8]);

impl SessionId {
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl From<[u8; 8]> for SessionId {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

/// Message header carried by every request and response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub session_id: SessionId,
    /// Unix time in seconds
    pub timestamp: u64,
}

impl Header {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        }
    }
}

// ============================================================================
// Response codes
// ============================================================================

/// Response code attached to every response message.
///
/// Declaration order matters: every `Ok*` and `Warning*` code compares less
/// than [`ResponseCode::Failed`], every `Failed*` code compares greater or equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    #[default]
    Ok,
    OkCertificateExpiresSoon,
    OkNewSessionEstablished,
    OkOldSessionJoined,
    OkPowerToleranceConfirmed,
    WarningAuthorizationSelectionInvalid,
    WarningCertificateExpired,
    WarningCertificateNotYetValid,
    WarningCertificateRevoked,
    WarningCertificateValidationError,
    WarningChallengeInvalid,
    WarningEimAuthorizationFailure,
    WarningEmspUnknown,
    WarningEvPowerProfileViolation,
    WarningGeneralPncAuthorizationError,
    WarningNoCertificateAvailable,
    WarningNoContractMatchingPcidFound,
    WarningPowerToleranceNotConfirmed,
    WarningScheduleRenegotiationFailed,
    WarningStandbyNotAllowed,
    WarningWpt,
    Failed,
    FailedAssociationError,
    FailedContactorError,
    FailedEvPowerProfileInvalid,
    FailedEvPowerProfileViolation,
    FailedMeteringSignatureNotValid,
    FailedNoEnergyTransferServiceSelected,
    FailedNoServiceRenegotiationSupported,
    FailedPauseNotAllowed,
    FailedPowerDeliveryNotApplied,
    FailedPowerToleranceNotConfirmed,
    FailedScheduleRenegotiation,
    FailedScheduleSelectionInvalid,
    FailedSequenceError,
    FailedServiceIdInvalid,
    FailedServiceSelectionInvalid,
    FailedSignatureError,
    FailedUnknownSession,
    FailedWrongChargeParameter,
}

impl ResponseCode {
    /// True for every code that terminates the session
    pub fn is_failure(self) -> bool {
        self >= ResponseCode::Failed
    }

    pub fn is_warning(self) -> bool {
        self >= ResponseCode::WarningAuthorizationSelectionInvalid && self < ResponseCode::Failed
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// Rational numbers
// ============================================================================

/// Physical value encoded as `value * 10^exponent`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationalNumber {
    pub value: i16,
    pub exponent: i8,
}

impl RationalNumber {
    pub const fn new(value: i16, exponent: i8) -> Self {
        Self { value, exponent }
    }

    /// Encode a float, keeping up to three decimals while the mantissa fits into i16
    pub fn from_float(input: f32) -> Self {
        let max = i16::MAX as f32;
        let mut scaled = input;
        let mut exponent: i8 = 0;

        while scaled.abs() > max && exponent < i8::MAX {
            scaled /= 10.0;
            exponent += 1;
        }

        while exponent > -3 {
            if (scaled - scaled.trunc()).abs() < 1e-4 {
                break;
            }
            let next = scaled * 10.0;
            if next.abs() > max {
                break;
            }
            scaled = next;
            exponent -= 1;
        }

        Self {
            value: scaled.round() as i16,
            exponent,
        }
    }

    pub fn to_float(self) -> f32 {
        self.value as f32 * 10f32.powi(self.exponent as i32)
    }
}

impl From<f32> for RationalNumber {
    fn from(value: f32) -> Self {
        Self::from_float(value)
    }
}

impl From<RationalNumber> for f32 {
    fn from(value: RationalNumber) -> Self {
        value.to_float()
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Energy transfer service identifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceCategory {
    Ac,
    #[default]
    Dc,
    Wpt,
    DcAcdp,
    AcBpt,
    DcBpt,
    DcAcdpBpt,
    Mcs,
    McsBpt,
}

impl ServiceCategory {
    /// Numeric service id as used on the wire
    pub fn id(self) -> u16 {
        match self {
            ServiceCategory::Ac => 1,
            ServiceCategory::Dc => 2,
            ServiceCategory::Wpt => 3,
            ServiceCategory::DcAcdp => 4,
            ServiceCategory::AcBpt => 5,
            ServiceCategory::DcBpt => 6,
            ServiceCategory::DcAcdpBpt => 7,
            ServiceCategory::Mcs => 8,
            ServiceCategory::McsBpt => 9,
        }
    }

    pub fn is_bpt(self) -> bool {
        matches!(
            self,
            ServiceCategory::AcBpt
                | ServiceCategory::DcBpt
                | ServiceCategory::DcAcdpBpt
                | ServiceCategory::McsBpt
        )
    }

    /// Services handled by the DC state path
    pub fn is_dc(self) -> bool {
        matches!(
            self,
            ServiceCategory::Dc
                | ServiceCategory::DcBpt
                | ServiceCategory::Mcs
                | ServiceCategory::McsBpt
        )
    }
}

/// Authorization service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authorization {
    #[default]
    Eim,
    Pnc,
}

// Parameter enums below carry their ServiceDetail wire values.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    #[default]
    Scheduled = 1,
    Dynamic = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobilityNeedsMode {
    #[default]
    ProvidedByEvcc = 1,
    ProvidedBySecc = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pricing {
    #[default]
    NoPricing = 0,
    AbsolutePricing = 1,
    PriceLevels = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DcConnector {
    #[default]
    Core = 1,
    Extended = 2,
    Dual2 = 3,
    Dual4 = 4,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BptChannel {
    #[default]
    Unified = 1,
    Separated = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorMode {
    #[default]
    GridFollowing = 1,
    GridForming = 2,
}

/// Processing status of an EVSE or EV operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Processing {
    #[default]
    Finished,
    Ongoing,
    OngoingWaitingForCustomerInteraction,
}

/// Charge progress requested in PowerDeliveryReq
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    #[default]
    Start,
    Stop,
    Standby,
    ScheduleRenegotiation,
}

/// Session handling requested in SessionStopReq
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargingSession {
    Pause,
    #[default]
    Terminate,
    ServiceRenegotiation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvseNotification {
    Pause,
    ExitStandby,
    Terminate,
    ScheduleRenegotiation,
    ServiceRenegotiation,
    MeteringConfirmation,
}

/// EVSE status attached to PowerDeliveryRes and DC_ChargeLoopRes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvseStatus {
    /// Seconds the EV may take to react to the notification
    pub notification_max_delay: u16,
    pub notification: EvseNotification,
}
