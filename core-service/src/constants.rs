//! Central Configuration Constants
//!
//! Single source of truth for file names and environment defaults.
//! Risk/alert thresholds live in `logic::config` so they can be overridden
//! from `config.json`.

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Home Security Platform";

/// Directory name under the local data dir
pub const DATA_DIR_NAME: &str = "HomeSecurity";

// ============================================
// Persisted file names (relative to the data dir)
// ============================================

pub const KNOWN_DEVICES_FILE: &str = "known_devices.json";
pub const CORRELATION_STATE_FILE: &str = ".correlation_state.json";
pub const INCIDENT_COUNTER_FILE: &str = ".incident_counter";
pub const LAST_SUMMARY_FILE: &str = ".last_soc_summary";
pub const LAST_LAN_FILE: &str = ".last_lan_ip";
pub const LOCK_FILE: &str = ".hsp.lock";
pub const SECURITY_LOG_FILE: &str = "security.log";
pub const CONFIG_FILE: &str = "config.json";
pub const EXPORT_DIR: &str = "exports";

/// Firewall rule name prefix. `HSP_BLOCK_<ip>` is the contract with the OS
/// firewall: existence checks and removal rely on it.
pub const RULE_PREFIX: &str = "HSP_BLOCK_";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Data directory from `HSP_DATA_DIR` or the platform local data dir
pub fn get_data_dir() -> PathBuf {
    std::env::var("HSP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DATA_DIR_NAME)
        })
}

/// Config path from `HSP_CONFIG` or `<data dir>/config.json`
pub fn get_config_path(data_dir: &std::path::Path) -> PathBuf {
    std::env::var("HSP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.join(CONFIG_FILE))
}

/// Check if safe mode is forced from the environment
pub fn is_safe_mode_forced() -> bool {
    std::env::var("HSP_SAFE_MODE")
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
