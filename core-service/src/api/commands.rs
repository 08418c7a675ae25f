//! CLI command handlers
//!
//! Thin driver: resolve config and paths, print the banner, then either run
//! one read-only report or a full monitoring cycle.

use anyhow::{Context as _, Result};
use chrono::Utc;
use serde_json::json;

use super::cli::{usage_text, version_text, Action, CliOptions};
use crate::constants;
use crate::logic::alerts::{alert, set_color_enabled, AlertLevel};
use crate::logic::command::ToolRunner;
use crate::logic::config::MonitorConfig;
use crate::logic::correlation::CorrelationEngine;
use crate::logic::device::{load_store, render_timeline};
use crate::logic::discovery::{Discovery, NmapDiscovery};
use crate::logic::reporting::{self, ExportError};
use crate::logic::response::{guardrails, require_elevation_or_warn, system_firewall, Enforcer, ProtectedSet};
use crate::logic::risk::StaticThreatIntel;
use crate::logic::storage::{DataPaths, InstanceLock};
use crate::logic::telemetry::SecurityLog;
use crate::logic::tracker::Monitor;

/// Resolved runtime settings for one invocation
pub struct AppContext {
    pub config: MonitorConfig,
    pub paths: DataPaths,
    pub quiet: bool,
}

impl AppContext {
    /// `HSP_DATA_DIR` / `HSP_CONFIG` / `HSP_SAFE_MODE` + flags
    pub fn from_env(opts: &CliOptions) -> Self {
        let paths = DataPaths::from_env();
        let mut config = MonitorConfig::load(&constants::get_config_path(&paths.data_dir));
        if opts.safe_mode || constants::is_safe_mode_forced() {
            config.enforcement.safe_mode = true;
        }
        Self {
            config,
            paths,
            quiet: opts.quiet,
        }
    }

    pub fn safe_mode(&self) -> bool {
        self.config.safe_mode()
    }
}

pub fn run(opts: &CliOptions) -> Result<()> {
    match opts.action {
        Action::Help => {
            println!("{}", usage_text());
            return Ok(());
        }
        Action::Version => {
            println!("{}", version_text());
            return Ok(());
        }
        _ => {}
    }

    let ctx = AppContext::from_env(opts);

    if opts.no_color || !ctx.config.logging.color_enabled {
        set_color_enabled(false);
    }
    if ctx.safe_mode() {
        alert(AlertLevel::Info, "SAFE MODE ENABLED - READ-ONLY SOC MODE");
    } else {
        ctx.paths
            .ensure_data_dir()
            .with_context(|| format!("cannot create data directory {}", ctx.paths.data_dir.display()))?;
    }

    startup(&ctx);

    match &opts.action {
        Action::Metrics => {
            let store = load_store(&ctx.paths.devices);
            print!("{}", reporting::render_metrics(&reporting::calculate_metrics(&store)));
        }
        Action::Visualize => {
            let store = load_store(&ctx.paths.devices);
            print!("{}", reporting::render_risk_history(&store));
            print!("{}", reporting::render_incident_summary(&store));
            print!(
                "{}",
                reporting::render_decay_view(&store, ctx.config.risk.daily_decay, Utc::now())
            );
        }
        Action::Summary => print_summary(&ctx),
        Action::Timeline(ip) => {
            let store = load_store(&ctx.paths.devices);
            print!("{}", render_timeline(&store, ip));
        }
        Action::TimelineExport(format, ip) => {
            let store = load_store(&ctx.paths.devices);
            match reporting::export_timeline(&store, ip, &ctx.paths.export_dir, *format) {
                Ok(path) => alert(AlertLevel::Low, &format!("Timeline exported to {}", path.display())),
                Err(ExportError::DeviceNotFound(ip)) => {
                    alert(AlertLevel::Warn, &format!("Device not found: {}", ip))
                }
                Err(e) => return Err(e.into()),
            }
        }
        Action::Export(format) => {
            let store = load_store(&ctx.paths.devices);
            let path = reporting::export_devices(&store, &ctx.paths.export_dir, *format, Utc::now())?;
            alert(AlertLevel::Low, &format!("SOC data exported to {}", path.display()));
        }
        Action::Scan => run_scan(&ctx)?,
        Action::Help | Action::Version => {}
    }

    Ok(())
}

/// Banner, startup log entry, daily summary
fn startup(ctx: &AppContext) {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    let ip = guardrails::local_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string());

    if !ctx.quiet {
        println!("{} initialized", constants::APP_NAME);
        println!("Running on {} ({})\n", host, ip);
    }
    log::info!("{} v{} on {} ({})", constants::APP_NAME, constants::APP_VERSION, host, ip);

    if ctx.safe_mode() {
        return;
    }

    let log = SecurityLog::new(&ctx.paths.security_log);
    log.log_event(
        AlertLevel::Info,
        "Platform started successfully",
        json!({"host": host, "ip": ip}),
    );

    if ctx.config.logging.daily_summary {
        let store = load_store(&ctx.paths.devices);
        if let Err(e) = reporting::log_daily_summary(&store, &ctx.paths.last_summary, &log, Utc::now()) {
            log::warn!("Daily summary marker not written: {}", e);
        }
    }
}

fn print_summary(ctx: &AppContext) {
    let now = Utc::now();
    let store = load_store(&ctx.paths.devices);
    let correlation = CorrelationEngine::load_read_only(
        &ctx.paths.correlation_state,
        ctx.config.correlation.window_secs,
        ctx.config.correlation.threshold,
    );

    let summary = reporting::summarize(&store, correlation.correlated_ips_at(now));
    print!("{}", reporting::render_summary(&summary, now));
}

/// One full monitoring cycle
pub fn run_scan(ctx: &AppContext) -> Result<()> {
    let safe_mode = ctx.safe_mode();
    let _lock = if safe_mode {
        None
    } else {
        Some(InstanceLock::acquire(&ctx.paths.lock).context("another monitoring run is in progress")?)
    };

    let runner = ToolRunner::new(ctx.config.discovery.command_timeout_secs);
    let enforcement_active = !safe_mode
        && ctx.config.enforcement.firewall_enabled
        && require_elevation_or_warn(&runner);

    let enforcer = Enforcer::new(
        system_firewall(runner),
        ProtectedSet::detect(&runner),
        ctx.config.risk.block_threshold,
    )
    .with_active(enforcement_active);

    let intel = StaticThreatIntel::from_config(&ctx.config.intel);
    let mut monitor = Monitor::new(ctx.config.clone(), ctx.paths.clone(), Box::new(intel), enforcer);

    let discovery = NmapDiscovery::new(
        ctx.config.discovery.scan_timeout_secs,
        ctx.config.discovery.command_timeout_secs,
        ctx.paths.last_lan_ip.clone(),
    )
    .with_network(ctx.config.discovery.network.as_deref());

    let devices = discovery.discover();
    let report = monitor.detect_new_devices(&devices);
    log::info!(
        "Cycle done: {} observed, {} new, {} incidents opened, {} blocked, {} errors",
        devices.len(),
        report.first_seen.len(),
        report.incidents_opened.len(),
        report.blocked.len(),
        report.errors
    );

    if !safe_mode {
        monitor.run_audit();
    }

    if !ctx.quiet {
        if report.first_seen.is_empty() {
            println!("No new devices detected.");
        } else {
            println!("{} new device(s) detected.", report.first_seen.len());
        }
    }
    Ok(())
}
