//! Console alerts
//!
//! Human-facing `[LEVEL] message` lines. Colour is applied per level and can
//! be switched off globally (`--no-color`, `logging.color_enabled`). The
//! structured security log never goes through here.

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
    Warn,
    Correlated,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Low => "LOW",
            AlertLevel::Medium => "MEDIUM",
            AlertLevel::High => "HIGH",
            AlertLevel::Critical => "CRITICAL",
            AlertLevel::Warn => "WARN",
            AlertLevel::Correlated => "CORRELATED",
        }
    }

    pub(crate) fn paint(&self, text: &str) -> ColoredString {
        match self {
            AlertLevel::Info => text.cyan(),
            AlertLevel::Low => text.green(),
            AlertLevel::Medium | AlertLevel::Warn => text.yellow(),
            AlertLevel::High => text.red(),
            AlertLevel::Critical => text.red().bold(),
            AlertLevel::Correlated => text.magenta(),
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disable (or re-enable) ANSI colour for every subsequent alert
pub fn set_color_enabled(enabled: bool) {
    if enabled {
        colored::control::unset_override();
    } else {
        colored::control::set_override(false);
    }
}

/// Plain `[LEVEL] message`
pub fn format_alert(level: AlertLevel, message: &str) -> String {
    format!("[{}] {}", level, message)
}

pub fn alert(level: AlertLevel, message: &str) {
    let line = format_alert(level, message);
    println!("{}", level.paint(&line));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_alert() {
        assert_eq!(
            format_alert(AlertLevel::High, "New device detected: 10.0.0.9"),
            "[HIGH] New device detected: 10.0.0.9"
        );
        assert_eq!(format_alert(AlertLevel::Warn, "x"), "[WARN] x");
    }
}
