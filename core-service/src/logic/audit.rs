//! Post-cycle consistency audit
//!
//! Read-only. Each violation is reported as a WARN alert and a structured
//! log entry; nothing is repaired here.

use serde_json::json;

use crate::logic::alerts::{alert, AlertLevel};
use crate::logic::device::{DeviceRecord, DeviceStore};
use crate::logic::incident::IncidentStatus;
use crate::logic::telemetry::SecurityLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditIssue {
    IncidentWithoutTimeline,
    BlockedWithoutIncident,
    HighRiskWithoutIncident,
    ClosedWithoutReason,
    MissingRiskHistory,
}

impl AuditIssue {
    /// Structured log message
    pub fn log_message(&self) -> &'static str {
        match self {
            AuditIssue::IncidentWithoutTimeline => "Audit issue: Incident without timeline",
            AuditIssue::BlockedWithoutIncident => "Audit issue: Blocked without incident",
            AuditIssue::HighRiskWithoutIncident => "Audit issue: High risk without incident",
            AuditIssue::ClosedWithoutReason => "Audit issue: Closed incident missing reason",
            AuditIssue::MissingRiskHistory => "Audit issue: Missing risk history",
        }
    }

    fn console_message(&self, ip: &str) -> String {
        match self {
            AuditIssue::IncidentWithoutTimeline => format!("Audit: Incident without timeline for {}", ip),
            AuditIssue::BlockedWithoutIncident => format!("Audit: Blocked device without incident {}", ip),
            AuditIssue::HighRiskWithoutIncident => format!("Audit: High risk without incident {}", ip),
            AuditIssue::ClosedWithoutReason => format!("Audit: Incident closed without reason {}", ip),
            AuditIssue::MissingRiskHistory => format!("Audit: Missing risk history for {}", ip),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub ip: String,
    pub issue: AuditIssue,
    pub risk_score: u8,
}

/// Violations for one device, in check order
pub fn check_device(device: &DeviceRecord, incident_threshold: u8) -> Vec<AuditIssue> {
    let mut issues = Vec::new();
    let incident = device.incident.as_ref();

    if incident.is_some() && device.events.is_empty() {
        issues.push(AuditIssue::IncidentWithoutTimeline);
    }
    if device.blocked && incident.is_none() {
        issues.push(AuditIssue::BlockedWithoutIncident);
    }
    if device.risk_score >= incident_threshold && incident.is_none() {
        issues.push(AuditIssue::HighRiskWithoutIncident);
    }
    if let Some(incident) = incident {
        let reason_missing = incident
            .closure_reason
            .as_deref()
            .map_or(true, |r| r.trim().is_empty());
        if incident.status == IncidentStatus::Closed && reason_missing {
            issues.push(AuditIssue::ClosedWithoutReason);
        }
    }
    if device.risk_history.is_empty() {
        issues.push(AuditIssue::MissingRiskHistory);
    }

    issues
}

pub fn run_audit_checks(store: &DeviceStore, incident_threshold: u8, log: &SecurityLog) -> Vec<AuditFinding> {
    let mut findings = Vec::new();

    for device in store.values() {
        for issue in check_device(device, incident_threshold) {
            alert(AlertLevel::Warn, &issue.console_message(&device.ip));

            let fields = if issue == AuditIssue::HighRiskWithoutIncident {
                json!({"ip": device.ip, "risk_score": device.risk_score})
            } else {
                json!({"ip": device.ip})
            };
            log.log_event(AlertLevel::Warn, issue.log_message(), fields);

            findings.push(AuditFinding {
                ip: device.ip.clone(),
                issue,
                risk_score: device.risk_score,
            });
        }
    }

    if findings.is_empty() {
        log::debug!("Audit clean ({} devices)", store.len());
    } else {
        log::warn!("Audit found {} issue(s)", findings.len());
    }
    findings
}
