//! Risk scoring
//!
//! Additive, order-independent factors clamped to 0..=100. Pure: the same
//! inputs always produce the same score.

use crate::logic::device::{DeviceRecord, Trigger, MAX_RISK};

use super::intel::ThreatAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskWeights {
    pub untrusted: i32,
    pub unknown_vendor: i32,
    pub manual_override: i32,
    pub new_device_alert: i32,
    pub correlated: i32,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            untrusted: 20,
            unknown_vendor: 15,
            manual_override: -10,
            new_device_alert: 25,
            correlated: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: u8,
    pub tags: Vec<String>,
}

pub fn calculate_risk(
    device: &DeviceRecord,
    correlated: bool,
    intel: &ThreatAssessment,
) -> RiskAssessment {
    calculate_risk_with_weights(device, correlated, intel, &RiskWeights::default())
}

pub fn calculate_risk_with_weights(
    device: &DeviceRecord,
    correlated: bool,
    intel: &ThreatAssessment,
    weights: &RiskWeights,
) -> RiskAssessment {
    let mut score = 0i32;

    if !device.trusted {
        score = score.saturating_add(weights.untrusted);
    }
    if device.is_unknown_vendor() {
        score = score.saturating_add(weights.unknown_vendor);
    }
    if device.manual_override {
        score = score.saturating_add(weights.manual_override);
    }
    if device.has_fired(Trigger::NewDeviceAlerted) {
        score = score.saturating_add(weights.new_device_alert);
    }
    if correlated {
        score = score.saturating_add(weights.correlated);
    }
    score = score.saturating_add(intel.risk_increment);

    RiskAssessment {
        score: score.clamp(0, MAX_RISK as i32) as u8,
        tags: intel.tags.clone(),
    }
}
