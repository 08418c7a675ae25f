//! API Module - command-line surface
//!
//! Structure:
//! - cli.rs: argv parsing into `CliOptions`
//! - commands.rs: handlers for each action and the monitoring cycle

pub mod cli;
pub mod commands;

pub use cli::{parse_cli_args, Action, CliOptions};
pub use commands::run;
