//! Sensor core error types

use akm_transport::BusError;
use thiserror::Error;

/// Errors from sensor core operations
#[derive(Error, Debug)]
pub enum SensorError {
    /// Transport layer error
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// WIA company code is not AKM's
    #[error("Not an AKM device: company ID 0x{0:02X}")]
    WrongCompany(u8),

    /// Device ID is not in the supported variant table
    #[error("Unknown device ID 0x{0:02X}")]
    UnknownChip(u8),

    /// Measurement did not complete in time
    #[error("Data not ready after {0} polls")]
    NotReady(u32),

    /// Device is suspended
    #[error("Device is suspended")]
    Suspended,

    /// Request the part cannot carry out
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Device returned data that could not be decoded
    #[error("Malformed data: {0}")]
    Malformed(String),
}

impl SensorError {
    /// Negative Linux status code for this error
    pub fn errno(&self) -> i32 {
        match self {
            SensorError::Bus(e) => e.errno(),
            SensorError::WrongCompany(_) | SensorError::UnknownChip(_) => -libc::ENODEV,
            SensorError::NotReady(_) => -libc::ETIMEDOUT,
            SensorError::Suspended => -libc::EBUSY,
            SensorError::InvalidArgument(_) => -libc::EINVAL,
            SensorError::Malformed(_) => -libc::EIO,
        }
    }
}
