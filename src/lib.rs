// AKM magnetometer bus drivers - shared library
// ID tables, bus shims, driver registry and board configuration

pub mod ak0991x_i2c;
pub mod ak0991x_spi;
pub mod ak8963_i2c;
pub mod board;
pub mod config;
pub mod driver;
pub mod error;
pub mod id_table;
pub mod registry;

pub use ak0991x_i2c::Ak0991xI2cDriver;
pub use ak0991x_spi::{Ak0991xSpiDriver, MAX_SPI_FREQ_HZ};
pub use ak8963_i2c::Ak8963I2cDriver;
pub use board::{attach_all, instantiate, Attach, BoardDevice, SimChip};
pub use config::{BoardConfig, I2cDeviceConfig, SpiDeviceConfig};
pub use driver::{BusClient, Driver, I2cClient, I2cDriver, SpiClient, SpiDriver};
pub use error::DriverError;
pub use id_table::{DeviceId, MatchSource, MatchTables};
pub use registry::{DeviceHandle, DeviceSummary, DriverRegistry, DriverSummary};

/// Registry with every AKM bus driver registered
///
/// The AK0991X I2C driver is registered ahead of the AK8963 one, so a
/// device named `ak0991x` never reaches the AK8963 driver.
pub fn default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register_i2c_driver(Ak0991xI2cDriver::new());
    registry.register_i2c_driver(Ak8963I2cDriver::new());
    registry.register_spi_driver(Ak0991xSpiDriver::new());
    registry
}
