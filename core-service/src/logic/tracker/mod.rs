//! Device Tracker - one monitoring cycle per discovery snapshot
//!
//! `Monitor` owns every piece of state a cycle touches (device store,
//! correlation cache, incident counter, enforcer, security log) and runs the
//! fixed per-device pipeline:
//!
//! decay -> detect new / MAC change / vendor check -> correlate -> score ->
//! incident transition -> risk snapshot -> enforce -> persist
//!
//! # Safe mode
//! Devices are scored on a scratch copy; alerts still print, but nothing is
//! written (store, correlation cache, counter) and the firewall is untouched.
//!
//! # Failure Strategy
//! A failure while handling one device is logged and counted; the cycle moves
//! on to the next device.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::logic::alerts::{alert, AlertLevel};
use crate::logic::analyst::{self, AnalystError};
use crate::logic::audit::{self, AuditFinding};
use crate::logic::config::MonitorConfig;
use crate::logic::correlation::CorrelationEngine;
use crate::logic::device::{
    add_event, load_store, load_store_for_update, normalize_mac, record_risk_snapshot, save_store, DeviceRecord,
    DeviceStore, Trigger, UNKNOWN_VENDOR,
};
use crate::logic::discovery::DiscoveredDevice;
use crate::logic::incident::{close_incident, open_incident, IncidentCounter, Severity};
use crate::logic::response::{AllowOutcome, EnforcementOutcome, Enforcer};
use crate::logic::risk::{apply_risk_decay, calculate_risk, ThreatIntel, MALICIOUS_ASN_TAG};
use crate::logic::storage::{DataPaths, StoreError};
use crate::logic::telemetry::SecurityLog;

// ============================================================================
// CONSTANTS
// ============================================================================

const THRESHOLD_INCIDENT_REASON: &str = "Risk score exceeded threshold";
const NORMALIZED_REASON: &str = "Risk score normalized";
const MALICIOUS_INCIDENT_REASON: &str = "Malicious ASN detected";

fn is_real_mac(mac: &str) -> bool {
    !mac.is_empty() && mac != "unknown"
}

// ============================================================================
// CYCLE REPORT
// ============================================================================

/// What one cycle did, for the caller's summary line and for tests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Devices seen for the first time
    pub first_seen: Vec<String>,
    /// Devices whose "new device" alert fired this cycle
    pub new_devices: Vec<String>,
    pub correlated: Vec<String>,
    pub incidents_opened: Vec<String>,
    pub incidents_closed: Vec<String>,
    pub blocked: Vec<String>,
    /// `(ip, score)` for every processed device
    pub scores: Vec<(String, u8)>,
    pub errors: usize,
}

impl CycleReport {
    pub fn score_of(&self, ip: &str) -> Option<u8> {
        self.scores.iter().find(|(i, _)| i == ip).map(|(_, s)| *s)
    }
}

// ============================================================================
// MONITOR
// ============================================================================

pub struct Monitor {
    config: MonitorConfig,
    paths: DataPaths,
    store: DeviceStore,
    correlation: CorrelationEngine,
    counter: IncidentCounter,
    intel: Box<dyn ThreatIntel>,
    enforcer: Enforcer,
    log: SecurityLog,
}

impl Monitor {
    /// Load persisted state from `paths`. In safe mode nothing under `paths`
    /// is written, including backup recovery.
    pub fn new(
        config: MonitorConfig,
        paths: DataPaths,
        intel: Box<dyn ThreatIntel>,
        enforcer: Enforcer,
    ) -> Self {
        let (window, threshold) = (config.correlation.window_secs, config.correlation.threshold);
        let (store, correlation) = if config.safe_mode() {
            (
                load_store(&paths.devices),
                CorrelationEngine::load_read_only(&paths.correlation_state, window, threshold),
            )
        } else {
            (
                load_store_for_update(&paths.devices),
                CorrelationEngine::load(&paths.correlation_state, window, threshold),
            )
        };
        let counter = IncidentCounter::new(&paths.incident_counter);
        let log = SecurityLog::new(&paths.security_log);

        log::info!("Monitor ready: {} known devices", store.len());
        Self {
            config,
            paths,
            store,
            correlation,
            counter,
            intel,
            enforcer,
            log,
        }
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn correlation(&self) -> &CorrelationEngine {
        &self.correlation
    }

    /// External signal sources (IDS hooks, tests) feed the same engine
    pub fn correlation_mut(&mut self) -> &mut CorrelationEngine {
        &mut self.correlation
    }

    pub fn security_log(&self) -> &SecurityLog {
        &self.log
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn is_safe_mode(&self) -> bool {
        self.config.safe_mode()
    }

    // ------------------------------------------------------------------------
    // Cycle
    // ------------------------------------------------------------------------

    pub fn detect_new_devices(&mut self, devices: &[DiscoveredDevice]) -> CycleReport {
        self.detect_new_devices_at(devices, Utc::now())
    }

    pub fn detect_new_devices_at(&mut self, devices: &[DiscoveredDevice], now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();
        let safe_mode = self.is_safe_mode();

        if !safe_mode {
            let decayed = apply_risk_decay(
                &mut self.store,
                self.config.risk.daily_decay,
                self.config.risk.minimum_risk,
                now,
            );
            if decayed > 0 {
                if let Err(e) = self.persist() {
                    log::error!("Failed to persist decayed scores: {}", e);
                    report.errors += 1;
                }
            }
        }

        for discovered in devices {
            if let Err(e) = self.process_device(discovered, now, &mut report) {
                log::error!("Failed to process {}: {}", discovered.ip, e);
                report.errors += 1;
            }
        }

        if !safe_mode && !devices.is_empty() {
            self.log.log_event_at(
                AlertLevel::Info,
                "Known devices updated",
                json!({
                    "observed": devices.len(),
                    "known": self.store.len(),
                    "new": report.first_seen.len(),
                }),
                now,
            );
        }

        report
    }

    fn process_device(
        &mut self,
        discovered: &DiscoveredDevice,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<(), StoreError> {
        let ip = discovered.ip.trim();
        if ip.is_empty() {
            log::warn!("Skipping discovered device without IP ({})", discovered.mac);
            return Ok(());
        }

        let safe_mode = self.is_safe_mode();
        let mac = normalize_mac(&discovered.mac);
        let vendor = match discovered.vendor.trim() {
            "" => UNKNOWN_VENDOR,
            v => v,
        };

        // Work on a copy; only committed outside safe mode
        let mut device = match self.store.get(ip) {
            Some(existing) => existing.clone(),
            None => {
                let mut device = DeviceRecord::new(ip, &mac, vendor, now);
                add_event(&mut device, "First seen on network", now);
                log::info!("First sighting of {} ({}, {})", ip, mac, device.vendor);
                report.first_seen.push(ip.to_string());
                device
            }
        };

        if discovered.asn.is_some() {
            device.asn = discovered.asn;
        }
        if discovered.country.is_some() {
            device.country = discovered.country.clone();
        }

        if !is_real_mac(&device.mac) && is_real_mac(&mac) {
            device.mac = mac.clone();
        }

        let mut correlation_fired = false;

        // MAC change on a known IP; placeholder MACs never count
        if is_real_mac(&mac) && is_real_mac(&device.mac) && device.mac != mac {
            let old = std::mem::replace(&mut device.mac, mac.clone());
            correlation_fired |= self.correlation.add_signal_at(ip, Severity::Medium, "mac_changed", now);
            alert(AlertLevel::Medium, &format!("MAC address changed for {}: {} -> {}", ip, old, mac));
            add_event(&mut device, &format!("MAC address changed from {} to {}", old, mac), now);
            if device.vendor != vendor {
                device.vendor = vendor.to_string();
            }
        }

        // New-device alert after the grace period
        let grace = self.config.alerts.new_device_grace_period as i64;
        if !device.has_fired(Trigger::NewDeviceAlerted)
            && (now - device.first_seen).num_seconds() >= grace
        {
            correlation_fired |= self.correlation.add_signal_at(ip, Severity::High, "new_device", now);
            alert(AlertLevel::High, &format!("New device detected: {}", ip));
            device.fire(Trigger::NewDeviceAlerted);
            add_event(&mut device, "New device alert triggered", now);
            report.new_devices.push(ip.to_string());
        }

        // Unknown vendor, once
        if device.is_unknown_vendor() && !device.has_fired(Trigger::VendorWarned) {
            correlation_fired |= self.correlation.add_signal_at(ip, Severity::Low, "unknown_vendor", now);
            alert(AlertLevel::Medium, &format!("Unknown vendor: {}", ip));
            device.fire(Trigger::VendorWarned);
            add_event(&mut device, "Unknown vendor detected", now);
        }

        let correlated = self.correlation.is_correlated_at(ip, now);
        if correlated {
            report.correlated.push(ip.to_string());
        }
        if correlation_fired {
            alert(AlertLevel::Correlated, &format!("Correlated suspicious activity: {}", ip));
            add_event(&mut device, "Correlated alert triggered", now);
            if !safe_mode {
                self.log.log_event_at(
                    AlertLevel::Correlated,
                    "Correlated signals",
                    json!({"ip": ip, "signals": self.correlation.signals(ip).len()}),
                    now,
                );
            }
        }

        // Score
        let intel = self.intel.evaluate_asn_threat(device.asn, device.country.as_deref());
        let assessment = calculate_risk(&device, correlated, &intel);
        device.risk_score = assessment.score;
        device.threat_tags = assessment.tags;
        report.scores.push((ip.to_string(), device.risk_score));

        if safe_mode {
            if intel.has_tag(MALICIOUS_ASN_TAG) {
                alert(AlertLevel::Critical, &format!("Malicious infrastructure detected: {}", ip));
            }
            log::info!("[safe mode] {} scored {}", ip, device.risk_score);
            return Ok(());
        }

        self.handle_malicious(&mut device, intel.has_tag(MALICIOUS_ASN_TAG), now, report);
        let score = device.risk_score;
        record_risk_snapshot(&mut device, score, now.date_naive());
        self.transition_incident(&mut device, now, report);

        if self.enforcer.evaluate_enforcement(&mut device, &self.log, now) == EnforcementOutcome::Blocked {
            report.blocked.push(ip.to_string());
        }

        self.store.insert(device);
        self.persist()
    }

    /// Force a CRITICAL incident the first time malicious infrastructure is seen
    fn handle_malicious(&mut self, device: &mut DeviceRecord, malicious: bool, now: DateTime<Utc>, report: &mut CycleReport) {
        if !malicious || device.has_fired(Trigger::MaliciousFlagged) {
            return;
        }

        alert(AlertLevel::Critical, &format!("Malicious infrastructure detected: {}", device.ip));

        if device.has_open_incident() {
            if let Some(incident) = device.incident.as_mut() {
                incident.severity = Severity::Critical;
            }
            add_event(device, "Incident escalated (malicious ASN)", now);
        } else {
            match open_incident(device, &mut self.counter, Severity::Critical, MALICIOUS_INCIDENT_REASON, now) {
                Ok(true) => {
                    add_event(device, "Incident opened (malicious ASN)", now);
                    report.incidents_opened.push(device.ip.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!("Could not open incident for {}: {}", device.ip, e);
                    report.errors += 1;
                    return;
                }
            }
        }

        device.fire(Trigger::MaliciousFlagged);
        self.log.log_event_at(
            AlertLevel::Critical,
            "Malicious infrastructure detected",
            json!({"ip": device.ip, "asn": device.asn, "risk_score": device.risk_score}),
            now,
        );
    }

    /// Threshold-driven OPEN/CLOSE. CRITICAL incidents stay open until an
    /// analyst acts.
    fn transition_incident(&mut self, device: &mut DeviceRecord, now: DateTime<Utc>, report: &mut CycleReport) {
        if device.risk_score >= self.config.risk.incident_threshold {
            match open_incident(device, &mut self.counter, Severity::High, THRESHOLD_INCIDENT_REASON, now) {
                Ok(true) => {
                    add_event(device, "Incident opened (risk threshold exceeded)", now);
                    let id = device.incident.as_ref().map(|i| i.id.clone()).unwrap_or_default();
                    alert(AlertLevel::High, &format!("Incident {} opened for {} (risk={})", id, device.ip, device.risk_score));
                    self.log.log_event_at(
                        AlertLevel::High,
                        "Incident opened",
                        json!({"ip": device.ip, "incident_id": id, "risk_score": device.risk_score}),
                        now,
                    );
                    report.incidents_opened.push(device.ip.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!("Could not open incident for {}: {}", device.ip, e);
                    alert(AlertLevel::Warn, &format!("Incident allocation failed for {}", device.ip));
                    report.errors += 1;
                }
            }
            return;
        }

        let critical = device
            .incident
            .as_ref()
            .map_or(false, |i| i.is_open() && i.severity == Severity::Critical);
        if critical {
            return;
        }

        if close_incident(device, NORMALIZED_REASON, now) {
            add_event(device, "Incident closed (risk normalized)", now);
            self.log.log_event_at(
                AlertLevel::Info,
                "Incident closed",
                json!({"ip": device.ip, "reason": NORMALIZED_REASON, "risk_score": device.risk_score}),
                now,
            );
            report.incidents_closed.push(device.ip.clone());
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        if self.is_safe_mode() {
            return Ok(());
        }
        save_store(&self.paths.devices, &self.store)
    }

    // ------------------------------------------------------------------------
    // Audit / analyst actions
    // ------------------------------------------------------------------------

    pub fn run_audit(&self) -> Vec<AuditFinding> {
        audit::run_audit_checks(&self.store, self.config.risk.incident_threshold, &self.log)
    }

    pub fn allow_device(&mut self, ip: &str, now: DateTime<Utc>) -> Result<AllowOutcome, AnalystError> {
        let outcome = analyst::allow_device(
            &mut self.store,
            &mut self.correlation,
            &self.enforcer,
            &self.log,
            ip,
            self.config.risk.manual_allow_decrement,
            now,
        )?;
        self.persist()?;
        Ok(outcome)
    }

    pub fn deny_device(&mut self, ip: &str, now: DateTime<Utc>) -> Result<(), AnalystError> {
        analyst::deny_device(&mut self.store, &self.log, ip, self.config.risk.incident_threshold, now)?;
        self.persist()?;
        Ok(())
    }
}
