//! Bus transport layer for AKM magnetometer drivers
//!
//! This crate provides the byte-level plumbing between a sensor core and the
//! bus a chip sits on:
//!
//! - I2C adapters (Linux i2c-dev, or simulated)
//! - SPI devices (Linux spidev, or simulated)
//! - [`Regmap`], register access formatted for either bus
//! - [`BusOps`], raw `rxdata`/`txdata` for cores that frame their own transfers

pub mod bus_ops;
pub mod error;
pub mod i2c;
pub mod regmap;
pub mod sim;
pub mod spi;
pub mod types;

#[cfg(all(target_os = "linux", feature = "linux"))]
mod linux_i2c;
#[cfg(all(target_os = "linux", feature = "linux"))]
mod linux_spi;

pub use bus_ops::{BusOps, I2cBusOps};
pub use error::BusError;
pub use i2c::{I2cAdapter, I2cBuf, I2cFunctionality, I2cMsg, SMBUS_BLOCK_MAX};
pub use regmap::{Regmap, RegmapBus, RegmapConfig};
pub use sim::{LoggedMsg, RegisterFile, SimControl, SimI2cAdapter, SimSpiDevice, SimTarget};
pub use spi::{SpiBus, SpiMode};
pub use types::{BusType, DeviceInfo};

#[cfg(all(target_os = "linux", feature = "linux"))]
pub use linux_i2c::LinuxI2cAdapter;
#[cfg(all(target_os = "linux", feature = "linux"))]
pub use linux_spi::{LinuxSpiDevice, SpiConfig, DEFAULT_SPI_SPEED_HZ};
