//! Enforcement: risk state -> firewall action
//!
//! Idempotent by construction. A block is only attempted when no
//! `HSP_BLOCK_<ip>` rule exists, and removal only when one does.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::firewall::Firewall;
use super::guardrails::ProtectedSet;
use crate::logic::alerts::{alert, AlertLevel};
use crate::logic::device::{add_event, DeviceRecord};
use crate::logic::telemetry::SecurityLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementOutcome {
    /// No privilege, firewall disabled, or safe mode
    Inactive,
    /// Trusted or manually overridden
    Exempt,
    Protected,
    BelowThreshold,
    AlreadyBlocked,
    Blocked,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowOutcome {
    Inactive,
    Protected,
    Unblocked,
    NoRule,
    Failed,
}

pub struct Enforcer {
    firewall: Box<dyn Firewall>,
    protected: ProtectedSet,
    block_threshold: u8,
    active: bool,
}

impl Enforcer {
    pub fn new(firewall: Box<dyn Firewall>, protected: ProtectedSet, block_threshold: u8) -> Self {
        Self {
            firewall,
            protected,
            block_threshold,
            active: true,
        }
    }

    /// Disable all firewall mutation (no privilege / safe mode / config)
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn evaluate_enforcement(
        &self,
        device: &mut DeviceRecord,
        log: &SecurityLog,
        now: DateTime<Utc>,
    ) -> EnforcementOutcome {
        if !self.active {
            return EnforcementOutcome::Inactive;
        }
        if device.is_analyst_controlled() {
            return EnforcementOutcome::Exempt;
        }
        if self.protected.is_protected(&device.ip) {
            return EnforcementOutcome::Protected;
        }
        if device.risk_score < self.block_threshold {
            return EnforcementOutcome::BelowThreshold;
        }
        if self.firewall.rule_exists(&device.ip) {
            device.blocked = true;
            return EnforcementOutcome::AlreadyBlocked;
        }

        let ip = device.ip.clone();
        let risk = device.risk_score;
        match self.firewall.add_block_rules(&ip) {
            Ok(()) => {
                device.blocked = true;
                alert(AlertLevel::High, &format!("Device BLOCKED via firewall: {} (risk={})", ip, risk));
                log.log_event_at(
                    AlertLevel::High,
                    "BLOCKED device via firewall",
                    json!({"ip": ip, "risk_score": risk, "backend": self.firewall.name()}),
                    now,
                );
                add_event(device, &format!("Device auto-blocked via firewall (risk={})", risk), now);
                EnforcementOutcome::Blocked
            }
            Err(e) => {
                alert(AlertLevel::High, &format!("Firewall block FAILED for {}: {}", ip, e));
                log.log_event_at(
                    AlertLevel::Warn,
                    "Firewall block failed",
                    json!({"ip": ip, "risk_score": risk, "error": e.to_string()}),
                    now,
                );
                EnforcementOutcome::Failed
            }
        }
    }

    /// Lift an existing block after an analyst allow
    pub fn enforce_manual_allow(
        &self,
        device: &mut DeviceRecord,
        log: &SecurityLog,
        now: DateTime<Utc>,
    ) -> AllowOutcome {
        if !self.active {
            return AllowOutcome::Inactive;
        }
        if self.protected.is_protected(&device.ip) {
            return AllowOutcome::Protected;
        }
        if !self.firewall.rule_exists(&device.ip) {
            device.blocked = false;
            return AllowOutcome::NoRule;
        }

        let ip = device.ip.clone();
        match self.firewall.remove_block_rules(&ip) {
            Ok(()) => {
                device.blocked = false;
                alert(AlertLevel::Low, &format!("Firewall block removed for trusted device: {}", ip));
                log.log_event_at(AlertLevel::Info, "UNBLOCKED device via manual allow", json!({"ip": ip}), now);
                AllowOutcome::Unblocked
            }
            Err(e) => {
                alert(AlertLevel::High, &format!("Firewall unblock FAILED for {}: {}", ip, e));
                log.log_event_at(
                    AlertLevel::Warn,
                    "Firewall unblock failed",
                    json!({"ip": ip, "error": e.to_string()}),
                    now,
                );
                AllowOutcome::Failed
            }
        }
    }
}
