use std::net::IpAddr;
use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::Monitor;
use crate::logic::config::{IntelConfig, MonitorConfig};
use crate::logic::device::{load_store, save_store, DeviceRecord, DeviceStore, Trigger};
use crate::logic::discovery::DiscoveredDevice;
use crate::logic::incident::{IncidentStatus, Severity};
use crate::logic::response::firewall::testing::RecordingFirewall;
use crate::logic::response::{AllowOutcome, Enforcer, ProtectedSet};
use crate::logic::risk::{NoThreatIntel, StaticThreatIntel, ThreatIntel, MALICIOUS_ASN_TAG};
use crate::logic::storage::DataPaths;
use crate::logic::telemetry::read_entries;

const GATEWAY: &str = "192.168.1.1";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

fn build(dir: &Path, config: MonitorConfig, intel: Box<dyn ThreatIntel>, fw: &Rc<RecordingFirewall>) -> Monitor {
    let gateway: IpAddr = GATEWAY.parse().unwrap();
    let enforcer = Enforcer::new(
        Box::new(fw.clone()),
        ProtectedSet::from_addrs([gateway]),
        config.risk.block_threshold,
    );
    Monitor::new(config, DataPaths::new(dir), intel, enforcer)
}

fn monitor(dir: &Path, fw: &Rc<RecordingFirewall>) -> Monitor {
    build(dir, MonitorConfig::default(), Box::new(NoThreatIntel), fw)
}

fn unknown_device(ip: &str) -> DiscoveredDevice {
    DiscoveredDevice::new(ip, "AA:BB:CC:00:00:01", "Unknown")
}

#[test]
fn test_full_scenario_score_block_allow() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    let ip = "192.168.1.50";
    let snapshot = vec![unknown_device(ip)];

    // First sighting: untrusted + unknown vendor, inside the grace period
    let report = m.detect_new_devices_at(&snapshot, t0());
    assert_eq!(report.first_seen, vec![ip.to_string()]);
    assert_eq!(report.score_of(ip), Some(35));
    let d = m.store().get(ip).unwrap();
    assert_eq!(d.mac, "aa:bb:cc:00:00:01");
    assert_eq!(d.events[0].message, "First seen on network");
    assert!(d.events.iter().any(|e| e.message == "Unknown vendor detected"));
    assert!(d.has_fired(Trigger::VendorWarned));
    assert_eq!(d.risk_history.len(), 1);

    // Grace period elapsed: 20 + 15 + 25, a single HIGH signal is not enough
    let report = m.detect_new_devices_at(&snapshot, t0() + Duration::seconds(301));
    assert_eq!(report.new_devices, vec![ip.to_string()]);
    assert_eq!(report.score_of(ip), Some(60));
    assert!(report.correlated.is_empty());
    assert!(m.store().get(ip).unwrap().incident.is_none());

    // Second HIGH signal inside the window
    assert!(m.correlation_mut().add_signal_at(ip, Severity::High, "port_scan", t0() + Duration::seconds(310)));

    let report = m.detect_new_devices_at(&snapshot, t0() + Duration::seconds(320));
    assert_eq!(report.score_of(ip), Some(90));
    assert_eq!(report.incidents_opened, vec![ip.to_string()]);
    assert_eq!(report.blocked, vec![ip.to_string()]);
    assert!(fw.has_rule(ip));

    let d = m.store().get(ip).unwrap();
    assert!(d.blocked);
    let incident = d.incident.as_ref().unwrap();
    assert_eq!(incident.id, "INC-2025-0001");
    assert_eq!(incident.status, IncidentStatus::Open);
    assert!(d.events.iter().any(|e| e.message == "Device auto-blocked via firewall (risk=90)"));

    // Persisted immediately
    let on_disk = load_store(&DataPaths::new(dir.path()).devices);
    assert_eq!(on_disk.get(ip), m.store().get(ip));

    // Analyst allow
    let outcome = m.allow_device(ip, t0() + Duration::seconds(330)).unwrap();
    assert_eq!(outcome, AllowOutcome::Unblocked);
    assert!(!fw.has_rule(ip));
    assert!(m.correlation().signals(ip).is_empty());
    let d = m.store().get(ip).unwrap();
    assert!(d.trusted);
    assert!(!d.blocked);
    assert_eq!(d.risk_score, 60);
    assert_eq!(d.incident.as_ref().unwrap().status, IncidentStatus::Closed);

    // Trusted: 15 - 10 + 25, never enforced again
    let report = m.detect_new_devices_at(&snapshot, t0() + Duration::seconds(340));
    assert_eq!(report.score_of(ip), Some(30));
    assert!(report.blocked.is_empty());
    assert_eq!(fw.call_count(), 2);

    let entries = read_entries(m.security_log().path()).unwrap();
    assert!(entries.iter().any(|e| e.message == "BLOCKED device via firewall"));
    assert!(entries.iter().any(|e| e.message == "Device manually allowed"));
    assert!(entries.iter().any(|e| e.message == "Known devices updated"));
}

#[test]
fn test_repeated_cycles_open_one_incident() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    let ip = "192.168.1.51";
    let snapshot = vec![unknown_device(ip)];

    m.detect_new_devices_at(&snapshot, t0());
    m.correlation_mut().add_signal_at(ip, Severity::High, "a", t0() + Duration::seconds(1));
    m.correlation_mut().add_signal_at(ip, Severity::Medium, "b", t0() + Duration::seconds(2));

    m.detect_new_devices_at(&snapshot, t0() + Duration::seconds(301));
    let first = m.store().get(ip).unwrap().incident.clone().unwrap();
    let report = m.detect_new_devices_at(&snapshot, t0() + Duration::seconds(302));

    assert!(report.incidents_opened.is_empty());
    let again = m.store().get(ip).unwrap().incident.clone().unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(first.opened_at, again.opened_at);
    // One add, no duplicate on the re-scan
    assert_eq!(fw.call_count(), 1);
}

#[test]
fn test_safe_mode_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let mut config = MonitorConfig::default();
    config.enforcement.safe_mode = true;
    let mut m = build(dir.path(), config, Box::new(NoThreatIntel), &fw);
    let ip = "192.168.1.52";

    m.correlation_mut().add_signal_at(ip, Severity::High, "a", t0());
    m.correlation_mut().add_signal_at(ip, Severity::High, "b", t0());
    let report = m.detect_new_devices_at(&[unknown_device(ip)], t0());

    assert_eq!(report.score_of(ip), Some(65));
    assert!(m.store().is_empty());
    assert_eq!(fw.call_count(), 0);

    let paths = DataPaths::new(dir.path());
    assert!(!paths.devices.exists());
    assert!(!paths.correlation_state.exists());
    assert!(!paths.incident_counter.exists());
    assert!(!paths.security_log.exists());
}

#[test]
fn test_safe_mode_leaves_corrupt_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let mut store = DeviceStore::default();
    store.insert(DeviceRecord::new("192.168.1.60", "aa:aa:aa:aa:aa:60", "Acme", t0()));
    save_store(&paths.devices, &store).unwrap();
    save_store(&paths.devices, &store).unwrap();
    std::fs::write(&paths.devices, b"{ corrupt").unwrap();

    let fw = Rc::new(RecordingFirewall::default());
    let mut config = MonitorConfig::default();
    config.enforcement.safe_mode = true;
    let m = build(dir.path(), config, Box::new(NoThreatIntel), &fw);

    assert!(m.store().contains("192.168.1.60"));
    assert_eq!(std::fs::read(&paths.devices).unwrap(), b"{ corrupt");
}

#[test]
fn test_malformed_record_does_not_drop_other_devices() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let good = "192.168.1.70";
    let broken = "192.168.1.71";

    let mut store = DeviceStore::default();
    store.insert(DeviceRecord::new(good, "aa:aa:aa:aa:aa:70", "Acme", t0()));
    store.insert(DeviceRecord::new(broken, "aa:aa:aa:aa:aa:71", "Acme", t0()));
    save_store(&paths.devices, &store).unwrap();

    let mut raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&paths.devices).unwrap()).unwrap();
    raw["devices"][broken]["risk_history"] = serde_json::json!([{"date": "bogus", "risk_score": 5}]);
    std::fs::write(&paths.devices, raw.to_string()).unwrap();

    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    m.detect_new_devices_at(&[DiscoveredDevice::new("192.168.1.72", "aa:aa:aa:aa:aa:72", "Acme")], t0());

    let on_disk = load_store(&paths.devices);
    assert!(on_disk.contains(good));
    assert!(on_disk.contains("192.168.1.72"));
    assert!(!on_disk.contains(broken));
}

#[test]
fn test_mac_change_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    let ip = "192.168.1.53";

    m.detect_new_devices_at(&[DiscoveredDevice::new(ip, "aa:aa:aa:aa:aa:01", "Acme")], t0());
    m.detect_new_devices_at(
        &[DiscoveredDevice::new(ip, "AA:AA:AA:AA:AA:02", "Acme")],
        t0() + Duration::seconds(10),
    );

    let d = m.store().get(ip).unwrap();
    assert_eq!(d.mac, "aa:aa:aa:aa:aa:02");
    assert!(d.events.iter().any(|e| e.message.starts_with("MAC address changed")));

    let signals = m.correlation().signals(ip);
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].reason, "mac_changed");
    assert_eq!(signals[0].severity, Severity::Medium);
}

#[test]
fn test_placeholder_mac_is_not_a_change() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    let ip = "192.168.1.54";

    m.detect_new_devices_at(&[DiscoveredDevice::new(ip, "aa:aa:aa:aa:aa:03", "Acme")], t0());
    m.detect_new_devices_at(&[DiscoveredDevice::new(ip, "UNKNOWN", "Acme")], t0() + Duration::seconds(5));

    assert_eq!(m.store().get(ip).unwrap().mac, "aa:aa:aa:aa:aa:03");
    assert!(m.correlation().signals(ip).is_empty());
}

#[test]
fn test_malicious_asn_forces_critical_incident() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let intel = StaticThreatIntel::from_config(&IntelConfig {
        malicious_asns: vec![64500],
        ..IntelConfig::default()
    });
    let mut m = build(dir.path(), MonitorConfig::default(), Box::new(intel), &fw);
    let ip = "192.168.1.55";
    let snapshot = vec![DiscoveredDevice::new(ip, "aa:aa:aa:aa:aa:04", "Acme").with_asn(64500, Some("NL"))];

    let report = m.detect_new_devices_at(&snapshot, t0());
    // 20 + 40: below the incident threshold, opened anyway
    assert_eq!(report.score_of(ip), Some(60));
    assert_eq!(report.incidents_opened, vec![ip.to_string()]);

    let d = m.store().get(ip).unwrap();
    assert!(d.has_fired(Trigger::MaliciousFlagged));
    assert!(d.threat_tags.iter().any(|t| t == MALICIOUS_ASN_TAG));
    let incident = d.incident.as_ref().unwrap();
    assert_eq!(incident.severity, Severity::Critical);
    assert_eq!(incident.reason, "Malicious ASN detected");
    assert!(!d.blocked);

    // Not auto-closed, not re-opened
    let report = m.detect_new_devices_at(&snapshot, t0() + Duration::seconds(60));
    assert!(report.incidents_closed.is_empty());
    assert!(report.incidents_opened.is_empty());
    assert!(m.store().get(ip).unwrap().has_open_incident());
}

#[test]
fn test_decay_runs_before_scoring() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());

    let mut stale = DeviceRecord::new("192.168.1.56", "aa:aa:aa:aa:aa:05", "Acme", t0() - Duration::days(10));
    stale.risk_score = 50;
    stale.last_risk_update = Some(t0() - Duration::days(3));
    let mut store = DeviceStore::default();
    store.insert(stale);
    save_store(&paths.devices, &store).unwrap();

    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    m.detect_new_devices_at(&[], t0());

    assert_eq!(m.store().get("192.168.1.56").unwrap().risk_score, 35);
    assert_eq!(load_store(&paths.devices).get("192.168.1.56").unwrap().risk_score, 35);
}

#[test]
fn test_device_failure_does_not_stop_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    std::fs::write(&paths.incident_counter, "not-a-number").unwrap();

    let fw = Rc::new(RecordingFirewall::default());
    let intel = StaticThreatIntel::from_config(&IntelConfig {
        malicious_asns: vec![64500],
        ..IntelConfig::default()
    });
    let mut m = build(dir.path(), MonitorConfig::default(), Box::new(intel), &fw);

    let bad = "192.168.1.57";
    let good = "192.168.1.58";
    let snapshot = vec![
        unknown_device(bad).with_asn(64500, None),
        DiscoveredDevice::new(good, "aa:aa:aa:aa:aa:06", "Acme"),
    ];

    let report = m.detect_new_devices_at(&snapshot, t0());
    assert!(report.errors >= 1);
    assert_eq!(report.score_of(good), Some(20));
    assert!(m.store().get(bad).unwrap().incident.is_none());
    assert!(!m.store().get(bad).unwrap().has_fired(Trigger::MaliciousFlagged));
    assert!(load_store(&paths.devices).contains(good));
}

#[test]
fn test_deny_persists() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    let ip = "192.168.1.59";

    m.detect_new_devices_at(&[DiscoveredDevice::new(ip, "aa:aa:aa:aa:aa:07", "Acme")], t0());
    m.deny_device(ip, t0() + Duration::seconds(5)).unwrap();

    let on_disk = load_store(&DataPaths::new(dir.path()).devices);
    assert_eq!(on_disk.get(ip).unwrap().risk_score, 70);
    assert!(m.deny_device("10.9.9.9", t0()).is_err());
}

#[test]
fn test_gateway_never_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let fw = Rc::new(RecordingFirewall::default());
    let mut m = monitor(dir.path(), &fw);
    let snapshot = vec![unknown_device(GATEWAY)];

    m.detect_new_devices_at(&snapshot, t0());
    m.correlation_mut().add_signal_at(GATEWAY, Severity::High, "a", t0());
    m.correlation_mut().add_signal_at(GATEWAY, Severity::High, "b", t0());
    let report = m.detect_new_devices_at(&snapshot, t0() + Duration::seconds(301));

    assert_eq!(report.score_of(GATEWAY), Some(90));
    assert!(report.blocked.is_empty());
    assert_eq!(fw.call_count(), 0);
    assert!(m.store().get(GATEWAY).unwrap().has_open_incident());
}
