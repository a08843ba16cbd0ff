//! Session identity and negotiated capabilities
//!
//! A [`Session`] is created at SessionSetup and carries:
//! - The 8 byte session id every later request is checked against
//! - Whether service renegotiation is supported (fixed once negotiated)
//! - The services offered during discovery/detail and the ones selected

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use tracing::debug;

use crate::message::{
    BptChannel, ControlMode, DcConnector, GeneratorMode, Header, MobilityNeedsMode, Pricing,
    ResponseCode, ServiceCategory, SessionId,
};

/// Source of session ids and PnC challenges
pub trait SessionIdGenerator: Send {
    fn session_id(&mut self) -> SessionId;

    /// 16 byte challenge for PnC authorization
    fn challenge(&mut self) -> Vec<u8>;
}

/// Generator backed by the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl SessionIdGenerator for RandomIdGenerator {
    fn session_id(&mut self) -> SessionId {
        let mut rng = rand::thread_rng();
        loop {
            let bytes: [u8; 8] = rng.gen();
            // all zero is what the EV sends when it has no session yet
            if bytes != [0u8; 8] {
                return SessionId(bytes);
            }
        }
    }

    fn challenge(&mut self) -> Vec<u8> {
        let bytes: [u8; 16] = rand::thread_rng().gen();
        bytes.to_vec()
    }
}

/// Deterministic generator counting up from a seed
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self { next: seed.max(1) }
    }
}

impl SessionIdGenerator for SequentialIdGenerator {
    fn session_id(&mut self) -> SessionId {
        let id = SessionId(self.next.to_be_bytes());
        self.next = self.next.wrapping_add(1).max(1);
        id
    }

    fn challenge(&mut self) -> Vec<u8> {
        let mut challenge = self.next.to_be_bytes().to_vec();
        challenge.extend_from_slice(&self.next.to_be_bytes());
        challenge
    }
}

/// Services and parameters the EV selected in ServiceSelection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedServiceParameters {
    pub selected_energy_service: ServiceCategory,
    pub selected_connector: DcConnector,
    pub selected_control_mode: ControlMode,
    pub selected_mobility_needs_mode: MobilityNeedsMode,
    pub selected_pricing: Pricing,
    /// Only set for BPT services
    pub selected_bpt_channel: Option<BptChannel>,
    pub selected_generator_mode: Option<GeneratorMode>,
}

impl Default for SelectedServiceParameters {
    fn default() -> Self {
        Self {
            selected_energy_service: ServiceCategory::Dc,
            selected_connector: DcConnector::Extended,
            selected_control_mode: ControlMode::Scheduled,
            selected_mobility_needs_mode: MobilityNeedsMode::ProvidedByEvcc,
            selected_pricing: Pricing::NoPricing,
            selected_bpt_channel: None,
            selected_generator_mode: None,
        }
    }
}

/// What the EVSE offered during service negotiation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferedServices {
    pub energy_services: Vec<ServiceCategory>,
    /// Parameter sets per service, keyed by parameter set id
    pub parameter_sets: HashMap<ServiceCategory, BTreeMap<u16, SelectedServiceParameters>>,
}

impl OfferedServices {
    pub fn offers(&self, service: ServiceCategory) -> bool {
        self.energy_services.contains(&service)
    }

    pub fn parameter_set(&self, service: ServiceCategory, id: u16) -> Option<&SelectedServiceParameters> {
        self.parameter_sets.get(&service)?.get(&id)
    }
}

/// ISO 15118-20 session
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    service_renegotiation_supported: bool,
    renegotiation_negotiated: bool,
    selected_services: SelectedServiceParameters,
    resumed: bool,
    pub offered_services: OfferedServices,
}

impl Session {
    /// New session with a random id
    pub fn new() -> Self {
        Self::with_generator(&mut RandomIdGenerator)
    }

    pub fn with_generator(generator: &mut dyn SessionIdGenerator) -> Self {
        Self::with_id(generator.session_id())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            service_renegotiation_supported: false,
            renegotiation_negotiated: false,
            selected_services: SelectedServiceParameters::default(),
            resumed: false,
            offered_services: OfferedServices::default(),
        }
    }

    /// Rebuild a paused session from what was saved at SessionStop
    pub fn resume(id: SessionId, selected_services: SelectedServiceParameters) -> Self {
        Self {
            selected_services,
            resumed: true,
            ..Self::with_id(id)
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// True if this session rejoined a paused one
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Header carrying this session's id and the current time
    pub fn header(&self) -> Header {
        Header::new(self.id)
    }

    /// Check the request's session id and build the response header
    pub fn validate_and_setup_header(&self, session_id: &SessionId) -> Result<Header, ResponseCode> {
        if *session_id != self.id {
            debug!("Unknown session {} (expected {})", session_id, self.id);
            return Err(ResponseCode::FailedUnknownSession);
        }
        Ok(self.header())
    }

    pub fn service_renegotiation_supported(&self) -> bool {
        self.service_renegotiation_supported
    }

    /// Fix renegotiation support; later calls keep the first value
    pub fn negotiate_service_renegotiation(&mut self, supported: bool) -> bool {
        if !self.renegotiation_negotiated {
            self.service_renegotiation_supported = supported;
            self.renegotiation_negotiated = true;
        }
        self.service_renegotiation_supported
    }

    pub fn selected_services(&self) -> &SelectedServiceParameters {
        &self.selected_services
    }

    pub fn select_services(&mut self, selected: SelectedServiceParameters) {
        self.selected_services = selected;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
