//! Correlation Engine - sliding-window signal aggregation
//!
//! Independent weak signals for the same IP are combined into a single
//! "correlated" verdict: at least `threshold` MEDIUM/HIGH signals inside the
//! trailing `window`. LOW/INFO signals are kept for history only.
//!
//! The cache is persisted to `.correlation_state.json` on every mutation so
//! correlation survives restarts of the monitor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::incident::Severity;
use crate::logic::storage::{self, StoreError};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_WINDOW_SECS: u64 = 600;
pub const DEFAULT_THRESHOLD: usize = 2;

// ============================================================================
// SIGNAL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub reason: String,
}

type SignalCache = BTreeMap<String, Vec<Signal>>;

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug)]
pub struct CorrelationEngine {
    window: Duration,
    threshold: usize,
    signals: SignalCache,
    /// `None` = in-memory only (safe mode, tests)
    state_path: Option<PathBuf>,
}

impl CorrelationEngine {
    /// In-memory engine with no persistence
    pub fn new(window_secs: u64, threshold: usize) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
            threshold,
            signals: BTreeMap::new(),
            state_path: None,
        }
    }

    /// Load the persisted cache and keep writing back to `path`
    pub fn load(path: &Path, window_secs: u64, threshold: usize) -> Self {
        let signals = storage::safe_load_restoring(path, decode_cache);
        log::debug!("Correlation cache loaded: {} IPs", signals.len());
        Self {
            signals,
            state_path: Some(path.to_path_buf()),
            ..Self::new(window_secs, threshold)
        }
    }

    /// Load the persisted cache without ever writing to `path`
    pub fn load_read_only(path: &Path, window_secs: u64, threshold: usize) -> Self {
        let signals = storage::safe_load_with(path, decode_cache);
        log::debug!("Correlation cache loaded read-only: {} IPs", signals.len());
        Self {
            signals,
            ..Self::new(window_secs, threshold)
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a signal now. See `add_signal_at`.
    pub fn add_signal(&mut self, ip: &str, severity: Severity, reason: &str) -> bool {
        self.add_signal_at(ip, severity, reason, Utc::now())
    }

    /// Append a signal, drop expired ones, persist, and report whether the IP
    /// now has enough MEDIUM/HIGH signals in the window.
    pub fn add_signal_at(
        &mut self,
        ip: &str,
        severity: Severity,
        reason: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let cutoff = now - self.window;
        let bucket = self.signals.entry(ip.to_string()).or_default();
        bucket.push(Signal {
            timestamp: now,
            severity,
            reason: reason.to_string(),
        });
        bucket.retain(|s| s.timestamp >= cutoff);

        if let Err(e) = self.save() {
            log::warn!("Failed to persist correlation state: {}", e);
        }

        let correlated = self.meaningful_in_window(ip, cutoff) >= self.threshold;
        if correlated {
            log::info!("Correlation threshold met for {} ({})", ip, reason);
        }
        correlated
    }

    /// Window verdict without inserting anything
    pub fn is_correlated_at(&self, ip: &str, now: DateTime<Utc>) -> bool {
        self.meaningful_in_window(ip, now - self.window) >= self.threshold
    }

    /// Purge an IP's bucket (device became trusted)
    pub fn clear_signals(&mut self, ip: &str) {
        if self.signals.remove(ip).is_some() {
            if let Err(e) = self.save() {
                log::warn!("Failed to persist correlation state: {}", e);
            }
        }
    }

    pub fn signals(&self, ip: &str) -> &[Signal] {
        self.signals.get(ip).map(Vec::as_slice).unwrap_or(&[])
    }

    /// IPs with any cached signal
    pub fn tracked_ips(&self) -> usize {
        self.signals.values().filter(|b| !b.is_empty()).count()
    }

    /// IPs currently over the correlation threshold
    pub fn correlated_ips_at(&self, now: DateTime<Utc>) -> usize {
        self.signals
            .keys()
            .filter(|ip| self.is_correlated_at(ip, now))
            .count()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        match &self.state_path {
            Some(path) => storage::atomic_write(path, &self.signals),
            None => Ok(()),
        }
    }

    fn meaningful_in_window(&self, ip: &str, cutoff: DateTime<Utc>) -> usize {
        self.signals(ip)
            .iter()
            .filter(|s| s.timestamp >= cutoff && s.severity.counts_toward_correlation())
            .count()
    }
}

/// Malformed individual signals are skipped rather than failing the file
fn decode_cache(bytes: &[u8]) -> Result<SignalCache, StoreError> {
    let raw: BTreeMap<String, Vec<Value>> = serde_json::from_slice(bytes)?;

    let mut cache = SignalCache::new();
    for (ip, entries) in raw {
        let signals: Vec<Signal> = entries
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        cache.insert(ip, signals);
    }
    Ok(cache)
}

// ============================================================================
// TESTS
// ============================================================================
