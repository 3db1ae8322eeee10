//! Read command: raw samples from every bound sensor.

use akm_sensor::MeasurementMode;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tracing::warn;

use super::{bind_board_nonempty, setup_interrupt_handler, CommandResult};
use crate::cli::{Cli, ReadMode};

pub fn run(cli: &Cli, count: u32, interval_ms: u64, mode: ReadMode, json: bool) -> CommandResult {
    let mut registry = bind_board_nonempty(cli)?;

    if mode == ReadMode::Continuous {
        for (handle, mag) in registry.magnetometers() {
            if let Err(e) = mag.set_mode(MeasurementMode::Continuous) {
                warn!("{handle}: cannot enter continuous mode: {e}");
            }
        }
    }

    let running = setup_interrupt_handler();
    let interval = Duration::from_millis(interval_ms);
    let mut taken = 0u32;

    while running.load(Ordering::SeqCst) && (count == 0 || taken < count) {
        for (handle, mag) in registry.magnetometers() {
            match mag.read_raw() {
                Ok(sample) if json => {
                    let line = serde_json::json!({
                        "device": handle.to_string(),
                        "chip": mag.chip(),
                        "location": mag.device().location,
                        "sample": sample,
                    });
                    println!("{line}");
                }
                Ok(sample) => {
                    println!("{handle} {:<9} {sample}", mag.chip());
                }
                Err(e) => {
                    eprintln!("{handle} {}: read failed: {e} ({})", mag.chip(), e.errno());
                }
            }
        }
        taken += 1;

        if count == 0 || taken < count {
            thread::sleep(interval);
        }
    }

    registry.shutdown()?;
    Ok(())
}
