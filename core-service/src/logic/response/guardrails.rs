//! Network guardrails
//!
//! Addresses that must never be blocked: loopback, this host, and the
//! default gateway. Blocking any of them would cut the monitor off from the
//! network it is watching.

use std::collections::HashSet;
use std::net::{IpAddr, UdpSocket};

use crate::logic::command::ToolRunner;

#[derive(Debug, Clone, Default)]
pub struct ProtectedSet {
    addrs: HashSet<IpAddr>,
}

impl ProtectedSet {
    pub fn from_addrs(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            addrs: addrs.into_iter().collect(),
        }
    }

    /// Local address + default gateway of this host
    pub fn detect(runner: &ToolRunner) -> Self {
        let mut addrs = HashSet::new();
        if let Some(local) = local_ip() {
            addrs.insert(local);
        }
        match default_gateway(runner) {
            Some(gw) => {
                addrs.insert(gw);
            }
            None => log::info!("Default gateway not found; only loopback and local address protected"),
        }
        log::debug!("Protected addresses: {:?}", addrs);
        Self { addrs }
    }

    /// Unparseable addresses are treated as protected
    pub fn is_protected(&self, ip: &str) -> bool {
        if ip.eq_ignore_ascii_case("localhost") {
            return true;
        }
        match ip.trim().parse::<IpAddr>() {
            Ok(addr) => addr.is_loopback() || addr.is_unspecified() || self.addrs.contains(&addr),
            Err(_) => true,
        }
    }
}

/// Primary outbound interface address. Connecting a UDP socket sends nothing.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?.ip();
    (!addr.is_unspecified()).then_some(addr)
}

pub fn default_gateway(runner: &ToolRunner) -> Option<IpAddr> {
    if cfg!(windows) {
        runner
            .stdout("route", &["print", "0.0.0.0"])
            .and_then(|out| parse_route_print(&out))
    } else {
        runner
            .stdout("ip", &["route", "show", "default"])
            .and_then(|out| parse_ip_route(&out))
    }
}

/// `route print 0.0.0.0`: `0.0.0.0  0.0.0.0  <gateway>  <iface>  <metric>`
pub fn parse_route_print(output: &str) -> Option<IpAddr> {
    output.lines().find_map(|line| {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["0.0.0.0", "0.0.0.0", gateway, ..] => gateway.parse().ok(),
            _ => None,
        }
    })
}

/// `ip route show default`: `default via <gateway> dev <iface> ...`
pub fn parse_ip_route(output: &str) -> Option<IpAddr> {
    output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("default") {
            return None;
        }
        let mut rest = parts.skip_while(|p| *p != "via");
        rest.next()?;
        rest.next()?.parse().ok()
    })
}
