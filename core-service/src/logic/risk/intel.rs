//! Threat-intel oracle
//!
//! ASN + country -> extra risk and tags. The monitor only depends on the
//! `ThreatIntel` trait; `StaticThreatIntel` is the config-driven default.

use std::collections::HashSet;

use crate::logic::config::IntelConfig;

/// Tag that forces a CRITICAL incident
pub const MALICIOUS_ASN_TAG: &str = "malicious_asn";
pub const HIGH_RISK_COUNTRY_TAG: &str = "high_risk_country";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreatAssessment {
    pub risk_increment: i32,
    pub tags: Vec<String>,
}

impl ThreatAssessment {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

pub trait ThreatIntel {
    fn evaluate_asn_threat(&self, asn: Option<u32>, country: Option<&str>) -> ThreatAssessment;
}

/// No enrichment at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThreatIntel;

impl ThreatIntel for NoThreatIntel {
    fn evaluate_asn_threat(&self, _asn: Option<u32>, _country: Option<&str>) -> ThreatAssessment {
        ThreatAssessment::none()
    }
}

/// Fixed ASN / country lists from `config.json`
#[derive(Debug, Clone, Default)]
pub struct StaticThreatIntel {
    malicious_asns: HashSet<u32>,
    high_risk_countries: HashSet<String>,
    asn_increment: i32,
    country_increment: i32,
}

impl StaticThreatIntel {
    pub fn from_config(config: &IntelConfig) -> Self {
        Self {
            malicious_asns: config.malicious_asns.iter().copied().collect(),
            high_risk_countries: config
                .high_risk_countries
                .iter()
                .map(|c| c.trim().to_uppercase())
                .collect(),
            asn_increment: config.malicious_asn_increment,
            country_increment: config.high_risk_country_increment,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.malicious_asns.is_empty() && self.high_risk_countries.is_empty()
    }
}

impl ThreatIntel for StaticThreatIntel {
    fn evaluate_asn_threat(&self, asn: Option<u32>, country: Option<&str>) -> ThreatAssessment {
        let mut assessment = ThreatAssessment::none();

        if let Some(asn) = asn {
            if self.malicious_asns.contains(&asn) {
                assessment.risk_increment = assessment.risk_increment.saturating_add(self.asn_increment);
                assessment.tags.push(MALICIOUS_ASN_TAG.to_string());
            }
        }

        if let Some(country) = country {
            if self.high_risk_countries.contains(&country.trim().to_uppercase()) {
                assessment.risk_increment = assessment.risk_increment.saturating_add(self.country_increment);
                assessment.tags.push(HIGH_RISK_COUNTRY_TAG.to_string());
            }
        }

        assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intel() -> StaticThreatIntel {
        StaticThreatIntel::from_config(&IntelConfig {
            malicious_asns: vec![64500],
            high_risk_countries: vec!["kp".to_string()],
            ..IntelConfig::default()
        })
    }

    #[test]
    fn test_malicious_asn_tagged() {
        let result = intel().evaluate_asn_threat(Some(64500), None);
        assert_eq!(result.risk_increment, 40);
        assert!(result.has_tag(MALICIOUS_ASN_TAG));
    }

    #[test]
    fn test_country_match_is_case_insensitive() {
        let result = intel().evaluate_asn_threat(Some(1), Some("KP"));
        assert_eq!(result.risk_increment, 10);
        assert_eq!(result.tags, vec![HIGH_RISK_COUNTRY_TAG.to_string()]);
    }

    #[test]
    fn test_extreme_increments_saturate() {
        let intel = StaticThreatIntel::from_config(&IntelConfig {
            malicious_asns: vec![64500],
            high_risk_countries: vec!["KP".to_string()],
            malicious_asn_increment: i32::MAX,
            high_risk_country_increment: i32::MAX,
        });
        let result = intel.evaluate_asn_threat(Some(64500), Some("KP"));
        assert_eq!(result.risk_increment, i32::MAX);
        assert_eq!(result.tags.len(), 2);
    }

    #[test]
    fn test_no_enrichment() {
        assert_eq!(intel().evaluate_asn_threat(None, None), ThreatAssessment::none());
        assert_eq!(NoThreatIntel.evaluate_asn_threat(Some(64500), Some("KP")), ThreatAssessment::none());
    }
}
