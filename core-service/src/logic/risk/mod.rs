//! Risk Module - scoring, decay and threat-intel enrichment
//!
//! # Components
//! - `scoring.rs`: additive 0..=100 score
//! - `decay.rs`: per-day relaxation before each scan
//! - `intel.rs`: `ThreatIntel` oracle (ASN / country)

pub mod scoring;
pub mod decay;
pub mod intel;

pub use scoring::{calculate_risk, calculate_risk_with_weights, RiskAssessment, RiskWeights};
pub use decay::{apply_risk_decay, decay_score};
pub use intel::{
    NoThreatIntel, StaticThreatIntel, ThreatAssessment, ThreatIntel, MALICIOUS_ASN_TAG,
};
