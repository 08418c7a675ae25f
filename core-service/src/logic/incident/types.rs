//! Incident Types - Lifecycle records and severities

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "OPEN",
            IncidentStatus::Closed => "CLOSED",
        }
    }
}

/// Shared severity scale for incidents and correlation signals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,     // Bookkeeping only
    Low,      // Contributes to history, never correlates
    Medium,   // Weak signal, correlates with another
    High,     // Strong signal
    Critical, // Malicious infrastructure
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Only MEDIUM and HIGH signals count toward correlation
    pub fn counts_toward_correlation(&self) -> bool {
        matches!(self, Severity::Medium | Severity::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    /// `INC-<year>-<NNNN>`
    pub id: String,
    pub status: IncidentStatus,
    pub severity: Severity,
    pub reason: String,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closure_reason: Option<String>,
}

impl Incident {
    pub fn open(id: String, severity: Severity, reason: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: IncidentStatus::Open,
            severity,
            reason: reason.to_string(),
            opened_at: now,
            closed_at: None,
            closure_reason: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == IncidentStatus::Open
    }

    /// Time from open to close; `None` while still open
    pub fn duration(&self) -> Option<Duration> {
        self.closed_at.map(|closed| closed - self.opened_at)
    }
}
