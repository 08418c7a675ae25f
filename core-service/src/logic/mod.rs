//! Logic Module - Monitoring engines
//!
//! Leaves first:
//! - `storage/` - atomic JSON persistence, backup recovery, instance lock
//! - `device/` - device registry, timeline, risk history, schema migration
//! - `risk/` - scoring, daily decay, threat-intel oracle
//! - `correlation/` - sliding-window signal aggregation
//! - `incident/` - OPEN/CLOSED lifecycle and incident IDs
//! - `response/` - firewall enforcement, guardrails, privilege probe
//! - `discovery/` - LAN selection, nmap sweep, OUI vendor table
//! - `tracker/` - per-scan orchestration (`Monitor`)
//! - `audit`, `analyst`, `reporting/` - post-cycle checks and SOC views

// Infrastructure
pub mod command;
pub mod config;
pub mod alerts;
pub mod telemetry;
pub mod storage;

// Engines
pub mod device;
pub mod risk;
pub mod correlation;
pub mod incident;
pub mod response;
pub mod discovery;

// Orchestration & views
pub mod tracker;
pub mod audit;
pub mod analyst;
pub mod reporting;
