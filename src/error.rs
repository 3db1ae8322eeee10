//! Driver-level error type

use akm_sensor::SensorError;
use akm_transport::BusError;
use thiserror::Error;

/// Errors returned by bus drivers and the driver registry
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Probe was called without a matching id table entry
    #[error("{0}: no matching device id")]
    NoDeviceId(String),

    #[error("{device}: adapter lacks {missing}")]
    MissingFunctionality {
        device: String,
        missing: &'static str,
    },

    #[error("{device}: spi CLK {hz} Hz too fast (max {max} Hz)")]
    ClockTooFast { device: String, hz: u32, max: u32 },

    #[error("No driver matches {0}")]
    NoDriver(String),

    #[error("Device {0} is not bound")]
    NotBound(String),

    #[error("Board configuration: {0}")]
    Config(String),
}

impl DriverError {
    /// Negative errno equivalent of this error
    pub fn errno(&self) -> i32 {
        match self {
            DriverError::Bus(e) => e.errno(),
            DriverError::Sensor(e) => e.errno(),
            DriverError::NoDeviceId(_)
            | DriverError::MissingFunctionality { .. }
            | DriverError::NoDriver(_)
            | DriverError::NotBound(_) => -libc::ENODEV,
            DriverError::ClockTooFast { .. } | DriverError::Config(_) => -libc::EINVAL,
        }
    }
}
