//! Privilege probe
//!
//! Firewall changes need administrator/root. The probe runs once at startup;
//! without privilege enforcement is inert and a single warning is printed.

use crate::logic::alerts::{alert, AlertLevel};
use crate::logic::command::ToolRunner;

pub fn is_elevated(runner: &ToolRunner) -> bool {
    if cfg!(windows) {
        // Only succeeds from an elevated prompt
        runner.succeeds("net", &["session"])
    } else {
        runner
            .stdout("id", &["-u"])
            .map(|uid| uid.trim() == "0")
            .unwrap_or(false)
    }
}

/// Probe and warn once. Detection keeps running either way.
pub fn require_elevation_or_warn(runner: &ToolRunner) -> bool {
    let elevated = is_elevated(runner);
    if !elevated {
        alert(AlertLevel::Warn, "Running without administrator privileges");
        alert(AlertLevel::Warn, "Firewall enforcement will be DISABLED");
        alert(AlertLevel::Warn, "Detection and SOC functions will continue");
        log::warn!("No administrator privileges: enforcement disabled");
    }
    elevated
}
