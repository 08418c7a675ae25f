//! Home Security Platform - Main Entry Point
//!
//! One invocation = one report or one monitoring cycle; scheduling is left to
//! cron / Task Scheduler.

use hsp_core::api;

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() {
    let opts = match api::parse_cli_args(std::env::args()) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    init_logging(opts.quiet);

    if let Err(e) = api::run(&opts) {
        log::error!("{:#}", e);
        eprintln!("[ERROR] {:#}", e);
        std::process::exit(1);
    }
}
