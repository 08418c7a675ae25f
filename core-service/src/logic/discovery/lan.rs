//! LAN address selection
//!
//! Picks the interface address whose /24 gets scanned. The last good choice
//! is remembered in `.last_lan_ip` so multi-homed hosts stay on one network.

use std::net::Ipv4Addr;
use std::path::Path;

use ipnetwork::Ipv4Network;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::logic::command::ToolRunner;

static IPV4_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").ok());

/// Docker / Hyper-V / WSL bridges live here
static VIRTUAL_RANGE: Lazy<Option<Ipv4Network>> = Lazy::new(|| "172.16.0.0/12".parse().ok());

/// Private, non-loopback IPv4 addresses of this host
pub fn interface_addresses(runner: &ToolRunner) -> Vec<Ipv4Addr> {
    if cfg!(windows) {
        runner
            .stdout("ipconfig", &[])
            .map(|out| parse_ipconfig(&out))
            .unwrap_or_default()
    } else {
        runner
            .stdout("ip", &["-4", "-o", "addr", "show"])
            .map(|out| parse_ip_addr(&out))
            .unwrap_or_default()
    }
}

/// `IPv4 Address. . . . . : 192.168.1.23`
pub fn parse_ipconfig(output: &str) -> Vec<Ipv4Addr> {
    output
        .lines()
        .filter(|line| line.contains("IPv4 Address"))
        .filter_map(first_ipv4)
        .filter(is_lan_candidate)
        .collect()
}

/// `2: eth0    inet 192.168.1.23/24 brd 192.168.1.255 scope global eth0`
pub fn parse_ip_addr(output: &str) -> Vec<Ipv4Addr> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace().skip_while(|p| *p != "inet");
            parts.next()?;
            parts.next()?.split('/').next()?.parse::<Ipv4Addr>().ok()
        })
        .filter(is_lan_candidate)
        .collect()
}

fn first_ipv4(line: &str) -> Option<Ipv4Addr> {
    let re = IPV4_RE.as_ref()?;
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

fn is_lan_candidate(addr: &Ipv4Addr) -> bool {
    addr.is_private() && !addr.is_loopback()
}

pub fn is_virtual_ip(addr: Ipv4Addr) -> bool {
    VIRTUAL_RANGE.as_ref().map_or(false, |range| range.contains(addr))
}

/// Preference: remembered address if still present, then 192.168/16, then
/// 10/8, then any other non-virtual candidate. The choice is remembered.
pub fn select_lan_ip(candidates: &[Ipv4Addr], last_lan_path: &Path) -> Option<Ipv4Addr> {
    let remembered = std::fs::read_to_string(last_lan_path)
        .ok()
        .and_then(|s| s.trim().parse::<Ipv4Addr>().ok());
    if let Some(last) = remembered {
        if candidates.contains(&last) {
            return Some(last);
        }
    }

    let real: Vec<Ipv4Addr> = candidates.iter().copied().filter(|a| !is_virtual_ip(*a)).collect();
    let chosen = real
        .iter()
        .find(|a| a.octets()[..2] == [192, 168])
        .or_else(|| real.iter().find(|a| a.octets()[0] == 10))
        .or_else(|| real.first())
        .copied()?;

    if let Err(e) = std::fs::write(last_lan_path, chosen.to_string()) {
        log::warn!("Could not remember LAN address: {}", e);
    }
    Some(chosen)
}

/// The /24 containing `ip`
pub fn network_from_ip(ip: Ipv4Addr) -> Option<Ipv4Network> {
    let net = Ipv4Network::new(ip, 24).ok()?;
    Ipv4Network::new(net.network(), 24).ok()
}
