//! akmctl - AKM magnetometer bus driver tool
//!
//! Binds the AK0991X and AK8963 bus drivers to the devices listed in a board
//! file and exercises them from userspace.

use clap::Parser;
use tracing_subscriber::EnvFilter;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Ids { json } => commands::ids::run(*json),
        Commands::Board => commands::ids::board(&cli),
        Commands::Probe { json } => commands::probe::run(&cli, *json),
        Commands::Read {
            count,
            interval_ms,
            mode,
            json,
        } => commands::read::run(&cli, *count, *interval_ms, *mode, *json),
        Commands::PmCycle {
            hold_ms,
            continuous,
        } => commands::pm::run(&cli, *hold_ms, *continuous),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "akm_driver={level},akm_sensor={level},akm_transport={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
