//! `pvesync` CLI - Proxmox VE to NetBox inventory synchronization
//!
//! `export` extracts guest inventory into a snapshot file, `import`
//! reconciles a snapshot into NetBox.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use pvesync_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let mut tracing_config =
        TracingConfig::new().with_level(TracingLevel::from_verbosity(cli.verbose, cli.quiet));
    if let Some(filter) = &cli.log_filter {
        tracing_config = tracing_config.with_filter(filter.clone());
    }
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("Warning: {e}");
    }

    let result = commands::dispatch(config_path, cli.command);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
