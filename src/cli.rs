// CLI definitions using clap

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "akmctl")]
#[command(author, version, about = "AKM magnetometer bus drivers (AK0991X, AK8963)")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Board file listing the attached devices
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emulate the chips instead of opening i2c-dev/spidev nodes
    #[arg(long, global = true)]
    pub simulate: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every driver's id, OF and ACPI match tables
    Ids {
        #[arg(long)]
        json: bool,
    },

    /// Print the board configuration in use
    Board,

    /// Bind every configured device and report the result
    Probe {
        #[arg(long)]
        json: bool,
    },

    /// Read raw samples from every bound sensor
    Read {
        /// Samples per sensor (0 = until Ctrl-C)
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,

        /// Delay between samples in milliseconds
        #[arg(short, long, default_value_t = 100)]
        interval_ms: u64,

        /// Measurement mode to run the sensors in
        #[arg(short, long, value_enum, default_value_t = ReadMode::Single)]
        mode: ReadMode,

        /// One JSON object per sample
        #[arg(long)]
        json: bool,
    },

    /// Suspend every bound device, then resume it
    #[command(name = "pm-cycle")]
    PmCycle {
        /// Time to stay suspended in milliseconds
        #[arg(long, default_value_t = 0)]
        hold_ms: u64,

        /// Put sensors in continuous mode first
        #[arg(long)]
        continuous: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReadMode {
    /// Trigger one measurement per sample
    Single,
    /// Let the sensor free-run and poll its data-ready flag
    Continuous,
}
