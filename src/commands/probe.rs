//! Probe command: bind the board and report each device.

use akm_driver::{DeviceHandle, DriverError, DriverRegistry, MatchSource};
use serde::Serialize;

use super::{bind_board, CommandResult};
use crate::cli::Cli;

#[derive(Serialize)]
struct ProbeReport {
    location: String,
    bound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    driver: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched_by: Option<MatchSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chip: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    irq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errno: Option<i32>,
}

fn report(
    registry: &mut DriverRegistry,
    location: String,
    result: &Result<DeviceHandle, DriverError>,
) -> ProbeReport {
    match result {
        Ok(handle) => {
            let summary = registry.device(*handle);
            let chip = registry.magnetometer(*handle).map(|m| m.chip());
            ProbeReport {
                location,
                bound: true,
                handle: Some(handle.to_string()),
                driver: summary.as_ref().map(|s| s.driver),
                matched_by: summary.as_ref().map(|s| s.matched_by),
                chip,
                irq: summary.and_then(|s| s.irq),
                error: None,
                errno: None,
            }
        }
        Err(e) => ProbeReport {
            location,
            bound: false,
            handle: None,
            driver: None,
            matched_by: None,
            chip: None,
            irq: None,
            error: Some(e.to_string()),
            errno: Some(e.errno()),
        },
    }
}

/// Bind every configured device, print what happened, then unbind
pub fn run(cli: &Cli, json: bool) -> CommandResult {
    let (mut registry, attached) = bind_board(cli)?;

    let reports: Vec<ProbeReport> = attached
        .into_iter()
        .map(|a| report(&mut registry, a.location, &a.result))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for r in &reports {
            if r.bound {
                println!(
                    "{:<24} {:<6} {:<8} via {:<8} {}{}",
                    r.location,
                    r.handle.as_deref().unwrap_or("-"),
                    r.driver.unwrap_or("-"),
                    r.matched_by.map(|m| m.to_string()).unwrap_or_default(),
                    r.chip.unwrap_or("?"),
                    r.irq.map(|irq| format!(" irq {irq}")).unwrap_or_default(),
                );
            } else {
                println!(
                    "{:<24} not bound: {} ({})",
                    r.location,
                    r.error.as_deref().unwrap_or(""),
                    r.errno.unwrap_or(0)
                );
            }
        }
        let bound = reports.iter().filter(|r| r.bound).count();
        println!("{bound}/{} device(s) bound", reports.len());
    }

    registry.shutdown()?;
    Ok(())
}
