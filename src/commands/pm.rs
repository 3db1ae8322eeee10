//! Power management command: suspend/resume cycle.

use akm_driver::DriverRegistry;
use akm_sensor::MeasurementMode;
use std::thread;
use std::time::Duration;
use tracing::warn;

use super::{bind_board_nonempty, CommandResult};
use crate::cli::Cli;

fn print_modes(registry: &mut DriverRegistry, label: &str) {
    println!("{label}:");
    for (handle, mag) in registry.magnetometers() {
        let state = if mag.is_suspended() { " (suspended)" } else { "" };
        match mag.mode() {
            Ok(mode) => println!("  {handle} {:<9} {mode}{state}", mag.chip()),
            Err(e) => println!("  {handle} {:<9} mode unknown: {e}{state}", mag.chip()),
        }
    }
}

/// Suspend every bound device, hold, then resume and show the restored modes
pub fn run(cli: &Cli, hold_ms: u64, continuous: bool) -> CommandResult {
    let mut registry = bind_board_nonempty(cli)?;

    if continuous {
        for (handle, mag) in registry.magnetometers() {
            if let Err(e) = mag.set_mode(MeasurementMode::Continuous) {
                warn!("{handle}: cannot enter continuous mode: {e}");
            }
        }
    }

    print_modes(&mut registry, "before suspend");

    registry.suspend_all()?;
    print_modes(&mut registry, "suspended");

    if hold_ms > 0 {
        thread::sleep(Duration::from_millis(hold_ms));
    }

    registry.resume_all()?;
    print_modes(&mut registry, "after resume");

    registry.shutdown()?;
    Ok(())
}
