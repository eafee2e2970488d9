//! squad CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Run reached Done
//! - 1: Run ended Failed
//! - 2: Configuration error before the run started

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod spec_file;
mod summary;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const RUN_FAILED: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
}

fn init_logging(verbose: bool, quiet: bool) {
    let directives: &[&str] = if verbose {
        &["squad=debug", "info"]
    } else if quiet {
        &["error"]
    } else {
        &["squad=info", "warn"]
    };

    let filter = directives
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);

    // Already initialized in tests; nothing to do.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args).await,
        Commands::Version => commands::version::execute()
            .await
            .map(|()| ExitCodes::SUCCESS),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(ExitCodes::CONFIG_ERROR)
        }
    }
}
