//! Common types for the transport layer

use std::fmt;

use serde::Serialize;

/// Bus a device is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    I2c,
    Spi,
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::I2c => f.write_str("i2c"),
            BusType::Spi => f.write_str("spi"),
        }
    }
}

/// Device identification passed down to the sensor core
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Bus type
    pub bus_type: BusType,
    /// Bus location, e.g. `/dev/i2c-1@0x0c` or `/dev/spidev0.1`
    pub location: String,
    /// Device name (modalias)
    pub name: String,
}

impl DeviceInfo {
    pub fn i2c(adapter: &str, addr: u16, name: &str) -> Self {
        Self {
            bus_type: BusType::I2c,
            location: format!("{adapter}@0x{addr:02x}"),
            name: name.to_string(),
        }
    }

    pub fn spi(path: &str, name: &str) -> Self {
        Self {
            bus_type: BusType::Spi,
            location: path.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.bus_type, self.location, self.name)
    }
}
