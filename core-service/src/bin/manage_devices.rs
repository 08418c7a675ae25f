//! Analyst device management
//!
//! `manage_devices list | allow <ip> | deny <ip>`

use anyhow::{bail, Context, Result};
use chrono::Utc;

use hsp_core::constants;
use hsp_core::logic::alerts::{alert, AlertLevel};
use hsp_core::logic::analyst::{render_device_list, AnalystError};
use hsp_core::logic::command::ToolRunner;
use hsp_core::logic::config::MonitorConfig;
use hsp_core::logic::device::load_store;
use hsp_core::logic::response::{is_elevated, system_firewall, Enforcer, ProtectedSet};
use hsp_core::logic::risk::StaticThreatIntel;
use hsp_core::logic::storage::{DataPaths, InstanceLock};
use hsp_core::logic::tracker::Monitor;

const USAGE: &str = "Usage: manage_devices list | allow <ip> | deny <ip>";

enum Command {
    List,
    Allow(String),
    Deny(String),
}

fn parse(args: &[String]) -> Result<Command> {
    match args {
        [cmd] if cmd == "list" => Ok(Command::List),
        [cmd, ip] if cmd == "allow" => Ok(Command::Allow(ip.clone())),
        [cmd, ip] if cmd == "deny" => Ok(Command::Deny(ip.clone())),
        _ => bail!("Invalid command\n{}", USAGE),
    }
}

fn monitor(paths: &DataPaths) -> Monitor {
    let mut config = MonitorConfig::load(&constants::get_config_path(&paths.data_dir));
    // Analyst actions always persist
    config.enforcement.safe_mode = false;

    let runner = ToolRunner::new(config.discovery.command_timeout_secs);
    let active = config.enforcement.firewall_enabled && is_elevated(&runner);
    if !active {
        log::warn!("Firewall changes disabled (no privilege or disabled in config)");
    }
    let enforcer = Enforcer::new(
        system_firewall(runner),
        ProtectedSet::detect(&runner),
        config.risk.block_threshold,
    )
    .with_active(active);

    let intel = StaticThreatIntel::from_config(&config.intel);
    Monitor::new(config, paths.clone(), Box::new(intel), enforcer)
}

fn report_missing(result: Result<(), AnalystError>) -> Result<()> {
    match result {
        Err(AnalystError::DeviceNotFound(ip)) => {
            alert(AlertLevel::Warn, &format!("Device not found: {}", ip));
            Ok(())
        }
        other => Ok(other?),
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("{}", USAGE);
        return Ok(());
    }
    let command = parse(&args)?;
    let paths = DataPaths::from_env();

    if let Command::List = command {
        print!("{}", render_device_list(&load_store(&paths.devices)));
        return Ok(());
    }

    paths.ensure_data_dir()?;
    let _lock = InstanceLock::acquire(&paths.lock).context("a monitoring run is in progress")?;
    let mut monitor = monitor(&paths);

    match command {
        Command::Allow(ip) => report_missing(monitor.allow_device(&ip, Utc::now()).map(|_| ())),
        Command::Deny(ip) => report_missing(monitor.deny_device(&ip, Utc::now())),
        Command::List => Ok(()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
