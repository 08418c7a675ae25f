//! Monitor Configuration
//!
//! Thresholds and switches for one monitoring run. Loaded from `config.json`
//! in the data directory; every section and field falls back to its default,
//! so a partial file only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::logic::correlation::{DEFAULT_THRESHOLD, DEFAULT_WINDOW_SECS};

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Open an incident at or above this score
    pub incident_threshold: u8,
    /// Block the device at or above this score
    pub block_threshold: u8,
    /// Points removed per elapsed day
    pub daily_decay: u8,
    /// Decay floor
    pub minimum_risk: u8,
    /// Risk reduction applied by an analyst allow
    pub manual_allow_decrement: u8,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            incident_threshold: 70,
            block_threshold: 85,
            daily_decay: 5,
            minimum_risk: 0,
            manual_allow_decrement: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Seconds after first sighting before a "new device" alert fires
    pub new_device_grace_period: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            new_device_grace_period: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    pub firewall_enabled: bool,
    /// Observe and alert only: no store writes, no firewall changes
    pub safe_mode: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            firewall_enabled: true,
            safe_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub window_secs: u64,
    pub threshold: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub color_enabled: bool,
    /// Emit the once-per-day SOC summary log line
    pub daily_summary: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            color_enabled: true,
            daily_summary: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// `nmap` sweep timeout
    pub scan_timeout_secs: u64,
    /// Timeout for firewall/route/privilege helpers
    pub command_timeout_secs: u64,
    /// Fixed CIDR to scan instead of the derived /24
    pub network: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 20,
            command_timeout_secs: 10,
            network: None,
        }
    }
}

/// Static threat-intel lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    pub malicious_asns: Vec<u32>,
    /// ISO 3166 alpha-2 codes
    pub high_risk_countries: Vec<String>,
    pub malicious_asn_increment: i32,
    pub high_risk_country_increment: i32,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            malicious_asns: Vec::new(),
            high_risk_countries: Vec::new(),
            malicious_asn_increment: 40,
            high_risk_country_increment: 10,
        }
    }
}

// ============================================================================
// MONITOR CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub risk: RiskConfig,
    pub alerts: AlertConfig,
    pub enforcement: EnforcementConfig,
    pub correlation: CorrelationConfig,
    pub logging: LoggingConfig,
    pub discovery: DiscoveryConfig,
    pub intel: IntelConfig,
}

impl MonitorConfig {
    /// Missing file -> defaults. Unreadable or invalid -> warning + defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        let parsed = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| serde_json::from_slice::<Self>(&bytes).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Invalid config {} ({}), using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Observe-only run, from config or `--safe-mode`
    pub fn safe_mode(&self) -> bool {
        self.enforcement.safe_mode
    }
}

// ============================================================================
// TESTS
// ============================================================================
