//! DC specific messages
//!
//! ChargeParameterDiscovery through WeldingDetection, including the
//! scheduled/dynamic and unidirectional/BPT control mode variants.

use serde::{Deserialize, Serialize};

use super::datatypes::*;

// ============================================================================
// DC_ChargeParameterDiscovery
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcCpdReqParams {
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub min_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
    pub min_voltage: RationalNumber,
    pub target_soc: Option<i8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BptDcCpdReqParams {
    pub charge: DcCpdReqParams,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
    pub min_discharge_current: RationalNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DcCpdReqTransferMode {
    Dc(DcCpdReqParams),
    BptDc(BptDcCpdReqParams),
}

impl Default for DcCpdReqTransferMode {
    fn default() -> Self {
        DcCpdReqTransferMode::Dc(DcCpdReqParams::default())
    }
}

impl DcCpdReqTransferMode {
    /// Charge side parameters, present in both modes
    pub fn charge_params(&self) -> &DcCpdReqParams {
        match self {
            DcCpdReqTransferMode::Dc(params) => params,
            DcCpdReqTransferMode::BptDc(params) => &params.charge,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryRequest {
    pub header: Header,
    pub transfer_mode: DcCpdReqTransferMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcCpdResParams {
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub min_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
    pub min_voltage: RationalNumber,
    pub power_ramp_limit: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BptDcCpdResParams {
    pub charge: DcCpdResParams,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
    pub min_discharge_current: RationalNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DcCpdResTransferMode {
    Dc(DcCpdResParams),
    BptDc(BptDcCpdResParams),
}

impl Default for DcCpdResTransferMode {
    fn default() -> Self {
        DcCpdResTransferMode::Dc(DcCpdResParams::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeParameterDiscoveryResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub transfer_mode: DcCpdResTransferMode,
}

// ============================================================================
// ScheduleExchange
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSeReqParams {
    pub departure_time: Option<u32>,
    pub target_energy: Option<RationalNumber>,
    pub max_energy: Option<RationalNumber>,
    pub min_energy: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicSeReqParams {
    pub departure_time: u32,
    pub minimum_soc: Option<i8>,
    pub target_soc: Option<i8>,
    pub target_energy: RationalNumber,
    pub max_energy: RationalNumber,
    pub min_energy: RationalNumber,
    pub max_v2x_energy: Option<RationalNumber>,
    pub min_v2x_energy: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScheduleExchangeReqControlMode {
    Scheduled(ScheduledSeReqParams),
    Dynamic(DynamicSeReqParams),
}

impl Default for ScheduleExchangeReqControlMode {
    fn default() -> Self {
        ScheduleExchangeReqControlMode::Scheduled(ScheduledSeReqParams::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleExchangeRequest {
    pub header: Header,
    pub max_supporting_points: u16,
    pub control_mode: ScheduleExchangeReqControlMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerScheduleEntry {
    /// Seconds
    pub duration: u32,
    pub power: RationalNumber,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerSchedule {
    /// Unix time the entries are relative to
    pub time_anchor: u64,
    pub entries: Vec<PowerScheduleEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTuple {
    pub schedule_tuple_id: u32,
    pub charging_schedule: PowerSchedule,
    pub discharging_schedule: Option<PowerSchedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSeResParams {
    pub schedule_tuples: Vec<ScheduleTuple>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicSeResParams {
    pub departure_time: Option<u32>,
    pub minimum_soc: Option<i8>,
    pub target_soc: Option<i8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScheduleExchangeResControlMode {
    Scheduled(ScheduledSeResParams),
    Dynamic(DynamicSeResParams),
}

impl Default for ScheduleExchangeResControlMode {
    fn default() -> Self {
        ScheduleExchangeResControlMode::Scheduled(ScheduledSeResParams::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleExchangeResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub processing: Processing,
    pub go_to_pause: Option<bool>,
    pub control_mode: ScheduleExchangeResControlMode,
}

// ============================================================================
// DC_CableCheck / DC_PreCharge
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcCableCheckRequest {
    pub header: Header,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcCableCheckResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub processing: Processing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcPreChargeRequest {
    pub header: Header,
    pub processing: Processing,
    pub present_voltage: RationalNumber,
    pub target_voltage: RationalNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcPreChargeResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub present_voltage: RationalNumber,
}

// ============================================================================
// PowerDelivery
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerDeliveryRequest {
    pub header: Header,
    pub processing: Processing,
    pub charge_progress: Progress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerDeliveryResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub status: Option<EvseStatus>,
}

// ============================================================================
// DC_ChargeLoop
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayParameters {
    pub present_soc: Option<i8>,
    pub minimum_soc: Option<i8>,
    pub target_soc: Option<i8>,
    pub maximum_soc: Option<i8>,
    pub remaining_time_to_minimum_soc: Option<u32>,
    pub remaining_time_to_target_soc: Option<u32>,
    pub remaining_time_to_maximum_soc: Option<u32>,
    pub charging_complete: Option<bool>,
    pub battery_energy_capacity: Option<RationalNumber>,
    pub inlet_hot: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledDcClReq {
    pub target_energy_request: Option<RationalNumber>,
    pub max_energy_request: Option<RationalNumber>,
    pub min_energy_request: Option<RationalNumber>,
    pub target_current: RationalNumber,
    pub target_voltage: RationalNumber,
    pub max_charge_power: Option<RationalNumber>,
    pub min_charge_power: Option<RationalNumber>,
    pub max_charge_current: Option<RationalNumber>,
    pub max_voltage: Option<RationalNumber>,
    pub min_voltage: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BptScheduledDcClReq {
    pub scheduled: ScheduledDcClReq,
    pub max_discharge_power: Option<RationalNumber>,
    pub min_discharge_power: Option<RationalNumber>,
    pub max_discharge_current: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicDcClReq {
    pub departure_time: Option<u32>,
    pub target_energy_request: RationalNumber,
    pub max_energy_request: RationalNumber,
    pub min_energy_request: RationalNumber,
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
    pub min_voltage: RationalNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BptDynamicDcClReq {
    pub dynamic: DynamicDcClReq,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
    pub max_v2x_energy_request: Option<RationalNumber>,
    pub min_v2x_energy_request: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DcChargeLoopReqControlMode {
    Scheduled(ScheduledDcClReq),
    ScheduledBpt(BptScheduledDcClReq),
    Dynamic(DynamicDcClReq),
    DynamicBpt(BptDynamicDcClReq),
}

impl Default for DcChargeLoopReqControlMode {
    fn default() -> Self {
        DcChargeLoopReqControlMode::Scheduled(ScheduledDcClReq::default())
    }
}

impl DcChargeLoopReqControlMode {
    pub fn control_mode(&self) -> ControlMode {
        match self {
            DcChargeLoopReqControlMode::Scheduled(_) | DcChargeLoopReqControlMode::ScheduledBpt(_) => {
                ControlMode::Scheduled
            }
            DcChargeLoopReqControlMode::Dynamic(_) | DcChargeLoopReqControlMode::DynamicBpt(_) => {
                ControlMode::Dynamic
            }
        }
    }

    pub fn is_bpt(&self) -> bool {
        matches!(
            self,
            DcChargeLoopReqControlMode::ScheduledBpt(_) | DcChargeLoopReqControlMode::DynamicBpt(_)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeLoopRequest {
    pub header: Header,
    pub display_parameters: Option<DisplayParameters>,
    pub meter_info_requested: bool,
    pub present_voltage: RationalNumber,
    pub control_mode: DcChargeLoopReqControlMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledDcClRes {
    pub max_charge_power: Option<RationalNumber>,
    pub min_charge_power: Option<RationalNumber>,
    pub max_charge_current: Option<RationalNumber>,
    pub max_voltage: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BptScheduledDcClRes {
    pub scheduled: ScheduledDcClRes,
    pub min_voltage: Option<RationalNumber>,
    pub max_discharge_power: Option<RationalNumber>,
    pub min_discharge_power: Option<RationalNumber>,
    pub max_discharge_current: Option<RationalNumber>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicDcClRes {
    pub departure_time: Option<u32>,
    pub minimum_soc: Option<i8>,
    pub target_soc: Option<i8>,
    pub ack_max_delay: Option<u16>,
    pub max_charge_power: RationalNumber,
    pub min_charge_power: RationalNumber,
    pub max_charge_current: RationalNumber,
    pub max_voltage: RationalNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BptDynamicDcClRes {
    pub dynamic: DynamicDcClRes,
    pub min_voltage: RationalNumber,
    pub max_discharge_power: RationalNumber,
    pub min_discharge_power: RationalNumber,
    pub max_discharge_current: RationalNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DcChargeLoopResControlMode {
    Scheduled(ScheduledDcClRes),
    ScheduledBpt(BptScheduledDcClRes),
    Dynamic(DynamicDcClRes),
    DynamicBpt(BptDynamicDcClRes),
}

impl Default for DcChargeLoopResControlMode {
    fn default() -> Self {
        DcChargeLoopResControlMode::Scheduled(ScheduledDcClRes::default())
    }
}

impl DcChargeLoopResControlMode {
    /// Empty response mode matching the kind of the request mode
    pub fn matching(req: &DcChargeLoopReqControlMode) -> Self {
        match req {
            DcChargeLoopReqControlMode::Scheduled(_) => {
                DcChargeLoopResControlMode::Scheduled(ScheduledDcClRes::default())
            }
            DcChargeLoopReqControlMode::ScheduledBpt(_) => {
                DcChargeLoopResControlMode::ScheduledBpt(BptScheduledDcClRes::default())
            }
            DcChargeLoopReqControlMode::Dynamic(_) => {
                DcChargeLoopResControlMode::Dynamic(DynamicDcClRes::default())
            }
            DcChargeLoopReqControlMode::DynamicBpt(_) => {
                DcChargeLoopResControlMode::DynamicBpt(BptDynamicDcClRes::default())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcChargeLoopResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub status: Option<EvseStatus>,
    pub present_current: RationalNumber,
    pub present_voltage: RationalNumber,
    pub power_limit_achieved: bool,
    pub current_limit_achieved: bool,
    pub voltage_limit_achieved: bool,
    pub control_mode: DcChargeLoopResControlMode,
}

// ============================================================================
// DC_WeldingDetection
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcWeldingDetectionRequest {
    pub header: Header,
    pub processing: Processing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcWeldingDetectionResponse {
    pub header: Header,
    pub response_code: ResponseCode,
    pub present_voltage: RationalNumber,
}
