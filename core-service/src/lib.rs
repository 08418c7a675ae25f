//! Home Security Platform - LAN Monitoring Core
//!
//! Turns device-discovery snapshots into risk-scored, correlated,
//! lifecycle-tracked incidents and optionally contains devices through the
//! OS firewall. `logic::tracker::Monitor` is the entry point for one scan.

pub mod api;
pub mod constants;
pub mod logic;
