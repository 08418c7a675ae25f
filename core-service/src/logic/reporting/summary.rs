//! SOC summary
//!
//! Fleet-level risk snapshot for `--summary`, and the once-per-day
//! `Daily SOC risk summary` security log entry.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::logic::alerts::AlertLevel;
use crate::logic::device::DeviceStore;
use crate::logic::storage::{self, StoreError};
use crate::logic::telemetry::SecurityLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Investigate,
    Elevated,
    Stable,
}

impl Verdict {
    pub fn from_highest(highest_risk: u8) -> Self {
        if highest_risk >= 70 {
            Verdict::Investigate
        } else if highest_risk >= 40 {
            Verdict::Elevated
        } else {
            Verdict::Stable
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Investigate => "SOC ACTION: High-risk device investigation required",
            Verdict::Elevated => "SOC ACTION: Elevated risk devices present",
            Verdict::Stable => "SOC STATUS: Network stable",
        }
    }

    pub fn level(&self) -> AlertLevel {
        match self {
            Verdict::Investigate => AlertLevel::High,
            Verdict::Elevated => AlertLevel::Medium,
            Verdict::Stable => AlertLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocSummary {
    pub total_devices: usize,
    /// Rounded to one decimal
    pub average_risk: f64,
    pub highest_risk: u8,
    pub correlated_devices: usize,
    pub verdict: Verdict,
}

pub fn summarize(store: &DeviceStore, correlated_devices: usize) -> SocSummary {
    let risks: Vec<u8> = store.values().map(|d| d.risk_score).collect();
    let highest_risk = risks.iter().copied().max().unwrap_or(0);
    let average_risk = if risks.is_empty() {
        0.0
    } else {
        let sum: u64 = risks.iter().map(|&r| r as u64).sum();
        (sum as f64 / risks.len() as f64 * 10.0).round() / 10.0
    };

    SocSummary {
        total_devices: risks.len(),
        average_risk,
        highest_risk,
        correlated_devices,
        verdict: Verdict::from_highest(highest_risk),
    }
}

pub fn render_summary(summary: &SocSummary, now: DateTime<Utc>) -> String {
    let rule = "-".repeat(40);
    let mut out = String::from("\n=== SOC SECURITY SUMMARY ===\n");
    out.push_str(&format!("Timestamp (UTC): {}\n", now.to_rfc3339()));
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("Total devices        : {}\n", summary.total_devices));
    out.push_str(&format!("Average risk score   : {:.1}\n", summary.average_risk));
    out.push_str(&format!("Highest device risk  : {}\n", summary.highest_risk));
    out.push_str(&format!("Correlated devices   : {}\n", summary.correlated_devices));
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("{}\n", summary.verdict.level().paint(summary.verdict.message())));
    out
}

/// Write the daily summary entry unless `marker` already holds today's date.
/// Returns true when an entry was written.
pub fn log_daily_summary(
    store: &DeviceStore,
    marker: &Path,
    log: &SecurityLog,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let today = now.date_naive().to_string();

    if let Ok(last) = fs::read_to_string(marker) {
        if last.trim() == today {
            return Ok(false);
        }
    }

    let summary = summarize(store, 0);
    log.log_event_at(
        AlertLevel::Info,
        "Daily SOC risk summary",
        json!({
            "date": today,
            "total_devices": summary.total_devices,
            "average_risk": summary.average_risk,
            "highest_risk": summary.highest_risk,
        }),
        now,
    );

    storage::atomic_write_bytes(marker, today.as_bytes())?;
    Ok(true)
}
