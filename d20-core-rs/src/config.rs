//! Configuration for the ISO 15118-20 session core
//!
//! - [`EvseSetupConfig`]: what the charger offers (services, limits, modes)
//! - [`SessionConfig`]: per-session view derived from the setup config
//! - [`DriverConfig`]: timeouts and channel sizing of the session driver

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::message::{
    Authorization, BptChannel, ControlMode, DcConnector, GeneratorMode, MobilityNeedsMode, Pricing,
    RationalNumber, ServiceCategory,
};

/// Min/max pair of a physical limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub max: RationalNumber,
    pub min: RationalNumber,
}

impl Limits {
    pub const fn new(max: RationalNumber, min: RationalNumber) -> Self {
        Self { max, min }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerCurrentLimits {
    pub power: Limits,
    pub current: Limits,
}

/// DC transfer limits of the EVSE
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcTransferLimits {
    pub charge_limits: PowerCurrentLimits,
    /// Present only when the power module can discharge (BPT)
    pub discharge_limits: Option<PowerCurrentLimits>,
    pub voltage: Limits,
    pub power_ramp_limit: Option<RationalNumber>,
}

impl Default for DcTransferLimits {
    fn default() -> Self {
        Self {
            charge_limits: PowerCurrentLimits {
                power: Limits::new(RationalNumber::new(150, 3), RationalNumber::new(0, 0)),
                current: Limits::new(RationalNumber::new(250, 0), RationalNumber::new(0, 0)),
            },
            discharge_limits: None,
            voltage: Limits::new(RationalNumber::new(900, 0), RationalNumber::new(150, 0)),
            power_ramp_limit: None,
        }
    }
}

/// Control mode / mobility needs mode pair the EVSE supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMobilityNeedsModes {
    pub control_mode: ControlMode,
    pub mobility_mode: MobilityNeedsMode,
}

/// Charger setup, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvseSetupConfig {
    pub evse_id: String,
    pub supported_energy_services: Vec<ServiceCategory>,
    pub authorization_services: Vec<Authorization>,
    pub enable_certificate_install_service: bool,
    pub dc_limits: DcTransferLimits,
    pub control_mobility_modes: Vec<ControlMobilityNeedsModes>,
    pub service_renegotiation_supported: bool,
}

impl Default for EvseSetupConfig {
    fn default() -> Self {
        Self {
            evse_id: "DE*PNX*E12345*1".to_string(),
            supported_energy_services: vec![ServiceCategory::Dc],
            authorization_services: vec![Authorization::Eim],
            enable_certificate_install_service: false,
            dc_limits: DcTransferLimits::default(),
            control_mobility_modes: vec![
                ControlMobilityNeedsModes {
                    control_mode: ControlMode::Scheduled,
                    mobility_mode: MobilityNeedsMode::ProvidedByEvcc,
                },
                ControlMobilityNeedsModes {
                    control_mode: ControlMode::Dynamic,
                    mobility_mode: MobilityNeedsMode::ProvidedByEvcc,
                },
            ],
            service_renegotiation_supported: false,
        }
    }
}

impl EvseSetupConfig {
    pub fn new(evse_id: impl Into<String>) -> Self {
        Self {
            evse_id: evse_id.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing fields fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Set the offered energy services
    pub fn with_energy_services(mut self, services: Vec<ServiceCategory>) -> Self {
        self.supported_energy_services = services;
        self
    }

    /// Set the offered authorization services
    pub fn with_authorization_services(mut self, services: Vec<Authorization>) -> Self {
        self.authorization_services = services;
        self
    }

    pub fn with_dc_limits(mut self, limits: DcTransferLimits) -> Self {
        self.dc_limits = limits;
        self
    }

    /// Set supported control/mobility mode pairs
    pub fn with_control_mobility_modes(mut self, modes: Vec<ControlMobilityNeedsModes>) -> Self {
        self.control_mobility_modes = modes;
        self
    }

    pub fn with_service_renegotiation(mut self, supported: bool) -> Self {
        self.service_renegotiation_supported = supported;
        self
    }

    pub fn with_certificate_install_service(mut self, enabled: bool) -> Self {
        self.enable_certificate_install_service = enabled;
        self
    }
}

/// One DC parameter set as offered in ServiceDetailRes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcParameterSet {
    pub connector: DcConnector,
    pub control_mode: ControlMode,
    pub mobility_needs_mode: MobilityNeedsMode,
    pub pricing: Pricing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcBptParameterSet {
    pub dc: DcParameterSet,
    pub bpt_channel: BptChannel,
    pub generator_mode: GeneratorMode,
}

/// Per-session configuration derived from [`EvseSetupConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub evse_id: String,
    pub supported_energy_services: Vec<ServiceCategory>,
    pub authorization_services: Vec<Authorization>,
    pub cert_install_service: bool,
    pub service_renegotiation_supported: bool,
    pub dc_parameter_list: Vec<DcParameterSet>,
    pub dc_bpt_parameter_list: Vec<DcBptParameterSet>,
    pub dc_limits: DcTransferLimits,
}

impl SessionConfig {
    pub fn new(setup: &EvseSetupConfig) -> Self {
        let dc_parameter_list: Vec<DcParameterSet> = setup
            .control_mobility_modes
            .iter()
            .map(|modes| DcParameterSet {
                connector: DcConnector::Extended,
                control_mode: modes.control_mode,
                mobility_needs_mode: modes.mobility_mode,
                pricing: Pricing::NoPricing,
            })
            .collect();

        let dc_bpt_parameter_list = dc_parameter_list
            .iter()
            .map(|dc| DcBptParameterSet {
                dc: *dc,
                bpt_channel: BptChannel::Unified,
                generator_mode: GeneratorMode::GridFollowing,
            })
            .collect();

        Self {
            evse_id: setup.evse_id.clone(),
            supported_energy_services: setup.supported_energy_services.clone(),
            authorization_services: setup.authorization_services.clone(),
            cert_install_service: setup.enable_certificate_install_service,
            service_renegotiation_supported: setup.service_renegotiation_supported,
            dc_parameter_list,
            dc_bpt_parameter_list,
            dc_limits: setup.dc_limits,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(&EvseSetupConfig::default())
    }
}

/// Session driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Time allowed between a response and the next request
    pub sequence_timeout: Duration,
    /// Upper bound for the whole cable check phase
    pub cable_check_timeout: Duration,
    /// Upper bound for the whole pre-charge phase
    pub pre_charge_timeout: Duration,
    /// Time the charger has to report closed contactors after pre-charge
    pub contactor_timeout: Duration,
    /// How often the async driver polls timeouts
    pub tick_interval: Duration,
    pub request_channel_capacity: usize,
    pub control_channel_capacity: usize,
    pub pause_resume_supported: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            sequence_timeout: Duration::from_secs(60),
            cable_check_timeout: Duration::from_secs(40),
            pre_charge_timeout: Duration::from_secs(7),
            contactor_timeout: Duration::from_secs(5),
            tick_interval: Duration::from_millis(50),
            request_channel_capacity: 16,
            control_channel_capacity: 64,
            pause_resume_supported: true,
        }
    }
}

impl DriverConfig {
    pub fn with_sequence_timeout(mut self, timeout: Duration) -> Self {
        self.sequence_timeout = timeout;
        self
    }

    pub fn with_cable_check_timeout(mut self, timeout: Duration) -> Self {
        self.cable_check_timeout = timeout;
        self
    }

    pub fn with_pre_charge_timeout(mut self, timeout: Duration) -> Self {
        self.pre_charge_timeout = timeout;
        self
    }

    pub fn with_contactor_timeout(mut self, timeout: Duration) -> Self {
        self.contactor_timeout = timeout;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Disable pause/resume (SessionStop Pause is then logged as an error)
    pub fn without_pause_resume(mut self) -> Self {
        self.pause_resume_supported = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_builder() {
        let config = EvseSetupConfig::new("DE*EK3*E0001*1")
            .with_energy_services(vec![ServiceCategory::Dc, ServiceCategory::DcBpt])
            .with_service_renegotiation(true);

        assert_eq!(config.evse_id, "DE*EK3*E0001*1");
        assert_eq!(config.supported_energy_services.len(), 2);
        assert!(config.service_renegotiation_supported);
        assert_eq!(config.authorization_services, vec![Authorization::Eim]);
    }

    #[test]
    fn test_session_config_parameter_sets() {
        let session_config = SessionConfig::new(&EvseSetupConfig::default());

        assert_eq!(session_config.dc_parameter_list.len(), 2);
        assert_eq!(session_config.dc_bpt_parameter_list.len(), 2);
        assert_eq!(
            session_config.dc_parameter_list[1].control_mode,
            ControlMode::Dynamic
        );
        assert_eq!(
            session_config.dc_bpt_parameter_list[0].dc.connector,
            DcConnector::Extended
        );
    }

    #[test]
    fn test_driver_config_builder() {
        let config = DriverConfig::default()
            .with_sequence_timeout(Duration::from_secs(2))
            .without_pause_resume();

        assert_eq!(config.sequence_timeout, Duration::from_secs(2));
        assert_eq!(config.cable_check_timeout, Duration::from_secs(40));
        assert!(!config.pause_resume_supported);
    }

    #[test]
    fn test_setup_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"evse_id": "DE*TST*E1*1", "supported_energy_services": ["Dc", "DcBpt"]}}"#
        )
        .unwrap();

        let config = EvseSetupConfig::from_file(file.path()).unwrap();
        assert_eq!(config.evse_id, "DE*TST*E1*1");
        assert_eq!(
            config.supported_energy_services,
            vec![ServiceCategory::Dc, ServiceCategory::DcBpt]
        );
        assert_eq!(config.authorization_services, vec![Authorization::Eim]);
    }

    #[test]
    fn test_setup_config_from_missing_file() {
        let result = EvseSetupConfig::from_file("/nonexistent/d20-setup.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
