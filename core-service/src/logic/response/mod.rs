//! Response Module - containment through the OS firewall
//!
//! # Components
//! - `firewall.rs`: `Firewall` trait, netsh / iptables backends
//! - `guardrails.rs`: addresses that are never blocked
//! - `privileges.rs`: administrator / root probe
//! - `enforcement.rs`: `Enforcer` (block on high risk, unblock on allow)

pub mod firewall;
pub mod guardrails;
pub mod privileges;
pub mod enforcement;

pub use firewall::{rule_name, system_firewall, Firewall, FirewallError, IptablesFirewall, NetshFirewall};
pub use guardrails::ProtectedSet;
pub use privileges::{is_elevated, require_elevation_or_warn};
pub use enforcement::{AllowOutcome, EnforcementOutcome, Enforcer};
