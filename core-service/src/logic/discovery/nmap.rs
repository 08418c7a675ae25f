//! `nmap -sn` output parsing

use once_cell::sync::Lazy;
use regex::Regex;

use super::vendor::lookup_vendor;
use super::DiscoveredDevice;
use crate::logic::device::UNKNOWN_VENDOR;

/// `Nmap scan report for 192.168.1.5` or `... for host.lan (192.168.1.5)`
static REPORT_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^Nmap scan report for (?:\S+ \()?(\d{1,3}(?:\.\d{1,3}){3})\)?").ok()
});

/// `MAC Address: AA:BB:CC:DD:EE:FF (Vendor Name)`
static MAC_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"MAC Address:\s*([0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5})(?:\s*\((.*)\))?").ok()
});

/// Hosts without a MAC line (the scanning host itself) are skipped
pub fn parse_nmap_output(output: &str) -> Vec<DiscoveredDevice> {
    let (Some(report_re), Some(mac_re)) = (REPORT_RE.as_ref(), MAC_RE.as_ref()) else {
        return Vec::new();
    };

    let mut devices = Vec::new();
    let mut current_ip: Option<String> = None;

    for line in output.lines().map(str::trim) {
        if let Some(caps) = report_re.captures(line) {
            current_ip = caps.get(1).map(|m| m.as_str().to_string());
            continue;
        }

        let Some(caps) = mac_re.captures(line) else {
            continue;
        };
        let Some(ip) = current_ip.take() else {
            continue;
        };

        let mac = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let reported = caps.get(2).map_or("", |m| m.as_str()).trim();
        let vendor = if reported.is_empty() || reported == UNKNOWN_VENDOR {
            lookup_vendor(&mac).to_string()
        } else {
            reported.to_string()
        };

        devices.push(DiscoveredDevice::new(&ip, &mac, &vendor));
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN: &str = "\
Starting Nmap 7.94 ( https://nmap.org ) at 2025-05-01 12:00 UTC
Nmap scan report for router.lan (192.168.1.1)
Host is up (0.0030s latency).
MAC Address: 00:11:22:AA:BB:CC (Unknown)
Nmap scan report for 192.168.1.20
Host is up (0.0050s latency).
MAC Address: F4:F5:D8:01:02:03 (Apple)
Nmap scan report for 192.168.1.23
Host is up.
Nmap scan report for 192.168.1.40
Host is up (0.010s latency).
MAC Address: 02:42:AC:11:00:02 (Unknown)
Nmap done: 256 IP addresses (4 hosts up) scanned in 2.51 seconds";

    #[test]
    fn test_parse_scan() {
        let devices = parse_nmap_output(SCAN);
        assert_eq!(devices.len(), 3);

        assert_eq!(devices[0].ip, "192.168.1.1");
        assert_eq!(devices[0].mac, "00:11:22:aa:bb:cc");
        assert_eq!(devices[0].vendor, "TP-Link");

        assert_eq!(devices[1].vendor, "Apple");
        assert_eq!(devices[2].ip, "192.168.1.40");
        assert_eq!(devices[2].vendor, "Unknown");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_nmap_output("").is_empty());
        assert!(parse_nmap_output("Note: Host seems down.").is_empty());
    }
}
