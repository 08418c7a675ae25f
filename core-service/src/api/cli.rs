//! Command-line flags for the `hsp` binary
//!
//! Action flags are mutually exclusive in effect: when several are given the
//! first in `Action` precedence order runs (metrics, visualize, summary,
//! timeline, timeline export, export).

use anyhow::{anyhow, Result};

use crate::constants::{APP_NAME, APP_VERSION};
use crate::logic::reporting::ExportFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Full discover -> detect -> enforce -> audit cycle
    Scan,
    Metrics,
    Visualize,
    Summary,
    Timeline(String),
    TimelineExport(ExportFormat, String),
    Export(ExportFormat),
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub quiet: bool,
    pub no_color: bool,
    pub safe_mode: bool,
    pub action: Action,
}

pub fn version_text() -> String {
    format!("{} v{}", APP_NAME, APP_VERSION)
}

pub fn usage_text() -> String {
    format!(
        "{version}
LAN device monitoring, risk scoring and enforcement

Usage:
  hsp [--quiet] [--no-color] [--safe-mode]
  hsp --summary | --metrics | --visualize
  hsp --timeline <IP>
  hsp --export <json|csv>
  hsp --timeline-export <json|csv> <IP>

Options:
      --quiet              Only print alerts
      --no-color           Disable coloured output
      --safe-mode          Observe only: no store writes, no firewall changes
      --summary            Print the SOC summary
      --metrics            Print SOC metrics (MTTD / MTTR)
      --visualize          Risk history, incident table and decay view
      --timeline <IP>      Print a device timeline
      --export <FMT>       Export all devices
      --timeline-export <FMT> <IP>
                           Export one device timeline
  -h, --help               Show this help text
  -V, --version            Show version",
        version = version_text()
    )
}

fn parse_format(flag: &str, raw: &str) -> Result<ExportFormat> {
    raw.parse::<ExportFormat>()
        .map_err(|e| anyhow!("Invalid value for {}: {}\n\n{}", flag, e, usage_text()))
}

fn missing_value(flag: &str, what: &str) -> anyhow::Error {
    anyhow!("Missing {} for {}\n\n{}", what, flag, usage_text())
}

pub fn parse_cli_args<I, S>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut iter = args.into_iter();
    let _program_name = iter.next();

    let mut quiet = false;
    let mut no_color = false;
    let mut safe_mode = false;
    let mut metrics = false;
    let mut visualize = false;
    let mut summary = false;
    let mut timeline: Option<String> = None;
    let mut timeline_export: Option<(ExportFormat, String)> = None;
    let mut export: Option<ExportFormat> = None;

    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        match arg {
            "-h" | "--help" => return Ok(options(quiet, no_color, safe_mode, Action::Help)),
            "-V" | "--version" => return Ok(options(quiet, no_color, safe_mode, Action::Version)),
            "--quiet" => quiet = true,
            "--no-color" => no_color = true,
            "--safe-mode" => safe_mode = true,
            "--summary" => summary = true,
            "--metrics" => metrics = true,
            "--visualize" => visualize = true,
            "--timeline" => {
                let ip = iter.next().ok_or_else(|| missing_value(arg, "<IP>"))?;
                timeline = Some(ip.as_ref().to_string());
            }
            "--export" => {
                let fmt = iter.next().ok_or_else(|| missing_value(arg, "<json|csv>"))?;
                export = Some(parse_format(arg, fmt.as_ref())?);
            }
            "--timeline-export" => {
                let fmt = iter.next().ok_or_else(|| missing_value(arg, "<json|csv>"))?;
                let fmt = parse_format(arg, fmt.as_ref())?;
                let ip = iter.next().ok_or_else(|| missing_value(arg, "<IP>"))?;
                timeline_export = Some((fmt, ip.as_ref().to_string()));
            }
            other => {
                return Err(anyhow!("Unknown argument: {}\n\n{}", other, usage_text()));
            }
        }
    }

    let action = if metrics {
        Action::Metrics
    } else if visualize {
        Action::Visualize
    } else if summary {
        Action::Summary
    } else if let Some(ip) = timeline {
        Action::Timeline(ip)
    } else if let Some((fmt, ip)) = timeline_export {
        Action::TimelineExport(fmt, ip)
    } else if let Some(fmt) = export {
        Action::Export(fmt)
    } else {
        Action::Scan
    };

    Ok(options(quiet, no_color, safe_mode, action))
}

fn options(quiet: bool, no_color: bool, safe_mode: bool, action: Action) -> CliOptions {
    CliOptions {
        quiet,
        no_color,
        safe_mode,
        action,
    }
}
