//! Analyst device management
//!
//! Manual `allow` / `deny` decisions. An allow is the only path that lifts a
//! firewall block; a deny only raises risk and lets the next cycle act.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::logic::alerts::{alert, AlertLevel};
use crate::logic::correlation::CorrelationEngine;
use crate::logic::device::{add_event, DeviceStore};
use crate::logic::incident::close_incident;
use crate::logic::response::{AllowOutcome, Enforcer};
use crate::logic::storage::StoreError;
use crate::logic::telemetry::SecurityLog;

pub const ALLOW_CLOSURE_REASON: &str = "Manually allowed by analyst";

#[derive(Debug, thiserror::Error)]
pub enum AnalystError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Trust the device, reduce its risk, lift any block, forget its signals and
/// close its open incident.
pub fn allow_device(
    store: &mut DeviceStore,
    correlation: &mut CorrelationEngine,
    enforcer: &Enforcer,
    log: &SecurityLog,
    ip: &str,
    risk_decrement: u8,
    now: DateTime<Utc>,
) -> Result<AllowOutcome, AnalystError> {
    let device = store
        .get_mut(ip)
        .ok_or_else(|| AnalystError::DeviceNotFound(ip.to_string()))?;

    device.trusted = true;
    device.manual_override = true;
    device.trusted_since = Some(now);
    device.set_risk(device.risk_score as i32 - risk_decrement as i32);

    let outcome = enforcer.enforce_manual_allow(device, log, now);
    if outcome == AllowOutcome::Inactive && device.blocked {
        log::warn!("{} is still blocked: firewall changes are disabled in this run", ip);
    }

    correlation.clear_signals(ip);
    close_incident(device, ALLOW_CLOSURE_REASON, now);
    add_event(device, "Manually allowed by analyst", now);

    log.log_event_at(
        AlertLevel::Info,
        "Device manually allowed",
        json!({"ip": ip, "risk_score": device.risk_score}),
        now,
    );
    alert(AlertLevel::Low, &format!("Device manually allowed and unblocked: {}", ip));
    Ok(outcome)
}

/// Revoke trust and raise risk to at least `risk_floor`
pub fn deny_device(
    store: &mut DeviceStore,
    log: &SecurityLog,
    ip: &str,
    risk_floor: u8,
    now: DateTime<Utc>,
) -> Result<(), AnalystError> {
    let device = store
        .get_mut(ip)
        .ok_or_else(|| AnalystError::DeviceNotFound(ip.to_string()))?;

    device.trusted = false;
    device.manual_override = false;
    device.trusted_since = None;
    device.risk_score = device.risk_score.max(risk_floor);
    add_event(device, "Manually denied by analyst", now);

    log.log_event_at(
        AlertLevel::Warn,
        "Device manually denied",
        json!({"ip": ip, "risk_score": device.risk_score}),
        now,
    );
    alert(AlertLevel::Medium, &format!("Device manually denied: {}", ip));
    Ok(())
}

/// `IP ADDRESS  TRUSTED  RISK  FIRST SEEN` table
pub fn render_device_list(store: &DeviceStore) -> String {
    let mut out = String::from("\nIP ADDRESS        TRUSTED  RISK  BLOCKED  FIRST SEEN\n");
    out.push_str(&"-".repeat(70));
    out.push('\n');

    for d in store.values() {
        out.push_str(&format!(
            "{:<17} {:<8} {:<5} {:<8} {}\n",
            d.ip,
            d.trusted,
            d.risk_score,
            d.blocked,
            d.first_seen.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}
