//! Device Types - Registry records and the versioned store

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::incident::Incident;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Vendor sentinel when discovery could not resolve the OUI
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Current on-disk schema of `known_devices.json`
pub const SCHEMA_VERSION: u32 = 2;

pub const MAX_RISK: u8 = 100;

// ============================================================================
// ONE-SHOT TRIGGERS
// ============================================================================

/// Alert conditions that fire at most once per device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Grace period elapsed, "new device" alert raised
    NewDeviceAlerted,
    /// Unknown vendor warning raised
    VendorWarned,
    /// Malicious infrastructure incident forced open
    MaliciousFlagged,
}

// ============================================================================
// TIMELINE / HISTORY ENTRIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub date: NaiveDate,
    pub risk_score: u8,
}

// ============================================================================
// DEVICE RECORD
// ============================================================================

fn unknown_vendor() -> String {
    UNKNOWN_VENDOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ip: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default = "unknown_vendor")]
    pub vendor: String,
    pub first_seen: DateTime<Utc>,

    // Analyst controls
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub manual_override: bool,
    #[serde(default)]
    pub trusted_since: Option<DateTime<Utc>>,

    #[serde(default)]
    pub triggers: BTreeSet<Trigger>,

    // Scoring
    #[serde(default)]
    pub risk_score: u8,
    #[serde(default)]
    pub threat_tags: Vec<String>,
    #[serde(default)]
    pub last_risk_update: Option<DateTime<Utc>>,

    // Threat-intel enrichment (optional, supplied by discovery)
    #[serde(default)]
    pub asn: Option<u32>,
    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub events: Vec<DeviceEvent>,
    #[serde(default)]
    pub risk_history: Vec<RiskSnapshot>,
    #[serde(default)]
    pub incident: Option<Incident>,

    /// A firewall block rule is active for this IP
    #[serde(default)]
    pub blocked: bool,
}

impl DeviceRecord {
    pub fn new(ip: &str, mac: &str, vendor: &str, now: DateTime<Utc>) -> Self {
        Self {
            ip: ip.to_string(),
            mac: normalize_mac(mac),
            vendor: if vendor.trim().is_empty() { unknown_vendor() } else { vendor.to_string() },
            first_seen: now,
            trusted: false,
            manual_override: false,
            trusted_since: None,
            triggers: BTreeSet::new(),
            risk_score: 0,
            threat_tags: Vec::new(),
            last_risk_update: None,
            asn: None,
            country: None,
            events: Vec::new(),
            risk_history: Vec::new(),
            incident: None,
            blocked: false,
        }
    }

    pub fn has_fired(&self, trigger: Trigger) -> bool {
        self.triggers.contains(&trigger)
    }

    /// Mark a trigger as fired. Returns false if it had already fired.
    pub fn fire(&mut self, trigger: Trigger) -> bool {
        self.triggers.insert(trigger)
    }

    pub fn is_unknown_vendor(&self) -> bool {
        self.vendor == UNKNOWN_VENDOR
    }

    /// Trusted or manually overridden devices are never auto-enforced
    pub fn is_analyst_controlled(&self) -> bool {
        self.trusted || self.manual_override
    }

    pub fn has_open_incident(&self) -> bool {
        self.incident.as_ref().map_or(false, |i| i.is_open())
    }

    pub fn set_risk(&mut self, score: i32) {
        self.risk_score = score.clamp(0, MAX_RISK as i32) as u8;
    }
}

pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_lowercase()
}

// ============================================================================
// DEVICE STORE
// ============================================================================

/// The persisted device registry, keyed by IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStore {
    pub schema_version: u32,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceRecord>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            devices: BTreeMap::new(),
        }
    }
}

impl DeviceStore {
    pub fn get(&self, ip: &str) -> Option<&DeviceRecord> {
        self.devices.get(ip)
    }

    pub fn get_mut(&mut self, ip: &str) -> Option<&mut DeviceRecord> {
        self.devices.get_mut(ip)
    }

    pub fn insert(&mut self, device: DeviceRecord) {
        self.devices.insert(device.ip.clone(), device);
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.devices.contains_key(ip)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }
}
