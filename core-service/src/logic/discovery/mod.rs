//! Discovery Module - who is on the LAN right now
//!
//! The monitor consumes an unordered snapshot of `DiscoveredDevice`s per
//! scan through the `Discovery` trait. `NmapDiscovery` is the OS-backed
//! implementation: pick the LAN address, ping-sweep its /24 with `nmap -sn`,
//! and fall back to a single local-host entry when the sweep yields nothing.
//!
//! # Components
//! - `lan.rs`: interface listing, LAN selection, /24 derivation
//! - `nmap.rs`: scan output parsing
//! - `vendor.rs`: OUI vendor fallback table

pub mod lan;
pub mod nmap;
pub mod vendor;

use std::path::PathBuf;

use ipnetwork::Ipv4Network;

use crate::logic::command::ToolRunner;
use crate::logic::response::guardrails;

pub use vendor::lookup_vendor;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    pub ip: String,
    pub mac: String,
    pub vendor: String,
    pub asn: Option<u32>,
    pub country: Option<String>,
}

impl DiscoveredDevice {
    pub fn new(ip: &str, mac: &str, vendor: &str) -> Self {
        Self {
            ip: ip.to_string(),
            mac: mac.to_string(),
            vendor: vendor.to_string(),
            asn: None,
            country: None,
        }
    }

    pub fn with_asn(mut self, asn: u32, country: Option<&str>) -> Self {
        self.asn = Some(asn);
        self.country = country.map(str::to_string);
        self
    }
}

pub trait Discovery {
    /// One scan. Failures degrade to an empty snapshot, never an error.
    fn discover(&self) -> Vec<DiscoveredDevice>;
}

// ============================================================================
// NMAP DISCOVERY
// ============================================================================

pub struct NmapDiscovery {
    scan_runner: ToolRunner,
    helper_runner: ToolRunner,
    last_lan_path: PathBuf,
    network: Option<Ipv4Network>,
}

impl NmapDiscovery {
    pub fn new(scan_timeout_secs: u64, helper_timeout_secs: u64, last_lan_path: PathBuf) -> Self {
        Self {
            scan_runner: ToolRunner::new(scan_timeout_secs),
            helper_runner: ToolRunner::new(helper_timeout_secs),
            last_lan_path,
            network: None,
        }
    }

    /// Scan a fixed network instead of the derived /24. Invalid CIDRs are
    /// ignored with a warning.
    pub fn with_network(mut self, cidr: Option<&str>) -> Self {
        if let Some(cidr) = cidr {
            match cidr.parse::<Ipv4Network>() {
                Ok(net) => self.network = Some(net),
                Err(e) => log::warn!("Ignoring invalid discovery network {:?}: {}", cidr, e),
            }
        }
        self
    }

    fn target_network(&self) -> Option<Ipv4Network> {
        if let Some(net) = self.network {
            return Some(net);
        }
        let candidates = lan::interface_addresses(&self.helper_runner);
        let lan_ip = lan::select_lan_ip(&candidates, &self.last_lan_path)?;
        lan::network_from_ip(lan_ip)
    }

    fn scan(&self, network: Ipv4Network) -> Vec<DiscoveredDevice> {
        let target = network.to_string();
        log::info!("Scanning {} with nmap", target);
        match self.scan_runner.stdout("nmap", &["-sn", &target]) {
            Some(output) => nmap::parse_nmap_output(&output),
            None => Vec::new(),
        }
    }
}

impl Discovery for NmapDiscovery {
    fn discover(&self) -> Vec<DiscoveredDevice> {
        if let Some(network) = self.target_network() {
            let devices = self.scan(network);
            if !devices.is_empty() {
                log::info!("Discovered {} devices", devices.len());
                return devices;
            }
        } else {
            log::info!("No LAN interface found");
        }

        match local_host_entry() {
            Some(device) => vec![device],
            None => Vec::new(),
        }
    }
}

/// Fallback snapshot: just this host
pub fn local_host_entry() -> Option<DiscoveredDevice> {
    let ip = guardrails::local_ip()?;
    log::info!("Scan yielded no devices; falling back to local host {}", ip);
    Some(DiscoveredDevice::new(&ip.to_string(), "UNKNOWN", "Local Host"))
}

/// Fixed snapshot, for replaying a scan
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    pub devices: Vec<DiscoveredDevice>,
}

impl Discovery for StaticDiscovery {
    fn discover(&self) -> Vec<DiscoveredDevice> {
        self.devices.clone()
    }
}
