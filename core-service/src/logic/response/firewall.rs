//! OS firewall backends
//!
//! Rules are named `HSP_BLOCK_<ip>`. The name is the only state: existence
//! checks and removal go through it, so enforcement stays idempotent across
//! runs without tracking rules locally.

use crate::constants::RULE_PREFIX;
use crate::logic::command::{CommandError, ToolRunner};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FirewallError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("'{command}' failed ({exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

// ============================================================================
// TRAIT
// ============================================================================

pub trait Firewall {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    fn rule_exists(&self, ip: &str) -> bool;

    /// Block inbound and outbound traffic for `ip`
    fn add_block_rules(&self, ip: &str) -> Result<(), FirewallError>;

    fn remove_block_rules(&self, ip: &str) -> Result<(), FirewallError>;
}

pub fn rule_name(ip: &str) -> String {
    format!("{}{}", RULE_PREFIX, ip)
}

/// Backend for the current OS
pub fn system_firewall(runner: ToolRunner) -> Box<dyn Firewall> {
    if cfg!(windows) {
        Box::new(NetshFirewall::new(runner))
    } else {
        Box::new(IptablesFirewall::new(runner))
    }
}

fn run_checked(runner: &ToolRunner, program: &str, args: &[&str]) -> Result<(), FirewallError> {
    let output = runner.run(program, args)?;
    if output.status.success() {
        Ok(())
    } else {
        Err(FirewallError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

// ============================================================================
// WINDOWS: netsh advfirewall
// ============================================================================

#[derive(Debug, Clone)]
pub struct NetshFirewall {
    runner: ToolRunner,
}

impl NetshFirewall {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    fn add_args(name: &str, ip: &str, direction: &str) -> Vec<String> {
        vec![
            "advfirewall".to_string(),
            "firewall".to_string(),
            "add".to_string(),
            "rule".to_string(),
            format!("name={}", name),
            format!("dir={}", direction),
            "action=block".to_string(),
            format!("remoteip={}", ip),
        ]
    }
}

impl Firewall for NetshFirewall {
    fn name(&self) -> &'static str {
        "netsh"
    }

    fn rule_exists(&self, ip: &str) -> bool {
        let name = format!("name={}", rule_name(ip));
        self.runner
            .succeeds("netsh", &["advfirewall", "firewall", "show", "rule", &name])
    }

    fn add_block_rules(&self, ip: &str) -> Result<(), FirewallError> {
        let name = rule_name(ip);
        for direction in ["in", "out"] {
            let args = Self::add_args(&name, ip, direction);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            run_checked(&self.runner, "netsh", &args)?;
        }
        Ok(())
    }

    fn remove_block_rules(&self, ip: &str) -> Result<(), FirewallError> {
        // Deleting by name removes both directions
        let name = format!("name={}", rule_name(ip));
        run_checked(
            &self.runner,
            "netsh",
            &["advfirewall", "firewall", "delete", "rule", &name],
        )
    }
}

// ============================================================================
// LINUX: iptables tagged with a comment
// ============================================================================

#[derive(Debug, Clone)]
pub struct IptablesFirewall {
    runner: ToolRunner,
}

impl IptablesFirewall {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    /// `(chain, address flag)` for inbound and outbound rules
    const RULES: [(&'static str, &'static str); 2] = [("INPUT", "-s"), ("OUTPUT", "-d")];

    fn rule_args<'a>(op: &'a str, chain: &'a str, flag: &'a str, ip: &'a str, comment: &'a str) -> [&'a str; 10] {
        [op, chain, flag, ip, "-m", "comment", "--comment", comment, "-j", "DROP"]
    }
}

impl Firewall for IptablesFirewall {
    fn name(&self) -> &'static str {
        "iptables"
    }

    fn rule_exists(&self, ip: &str) -> bool {
        let comment = rule_name(ip);
        let (chain, flag) = Self::RULES[0];
        self.runner
            .succeeds("iptables", &Self::rule_args("-C", chain, flag, ip, &comment))
    }

    fn add_block_rules(&self, ip: &str) -> Result<(), FirewallError> {
        let comment = rule_name(ip);
        for (chain, flag) in Self::RULES {
            run_checked(&self.runner, "iptables", &Self::rule_args("-A", chain, flag, ip, &comment))?;
        }
        Ok(())
    }

    fn remove_block_rules(&self, ip: &str) -> Result<(), FirewallError> {
        let comment = rule_name(ip);
        let mut last_err = None;
        let mut removed = 0;
        for (chain, flag) in Self::RULES {
            match run_checked(&self.runner, "iptables", &Self::rule_args("-D", chain, flag, ip, &comment)) {
                Ok(()) => removed += 1,
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) if removed == 0 => Err(e),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// TEST DOUBLE
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_name_contract() {
        assert_eq!(rule_name("192.168.1.44"), "HSP_BLOCK_192.168.1.44");
    }

    #[test]
    fn test_netsh_rule_args() {
        let args = NetshFirewall::add_args("HSP_BLOCK_10.0.0.5", "10.0.0.5", "out");
        assert_eq!(args[4], "name=HSP_BLOCK_10.0.0.5");
        assert_eq!(args[5], "dir=out");
        assert_eq!(args[7], "remoteip=10.0.0.5");
    }

    #[test]
    fn test_iptables_rule_args() {
        let args = IptablesFirewall::rule_args("-A", "OUTPUT", "-d", "10.0.0.5", "HSP_BLOCK_10.0.0.5");
        assert_eq!(
            args.join(" "),
            "-A OUTPUT -d 10.0.0.5 -m comment --comment HSP_BLOCK_10.0.0.5 -j DROP"
        );
    }

    #[test]
    fn test_missing_tool_means_no_rule() {
        // netsh is absent off Windows
        let runner = ToolRunner::new(2);
        let fw = NetshFirewall::new(runner);
        if cfg!(not(windows)) {
            assert!(!fw.rule_exists("10.0.0.5"));
            assert!(fw.add_block_rules("10.0.0.5").is_err());
        }
    }
}
