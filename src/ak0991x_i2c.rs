//! AK0991X I2C bus driver

use akm_sensor::{Ak0991xCore, Ak0991xDevice, Magnetometer, SensorCore};
use akm_transport::{Regmap, RegmapConfig};
use tracing::error;

use crate::driver::{BusClient, Driver, I2cClient};
use crate::error::DriverError;
use crate::id_table::{
    DeviceId, MatchTables, AK0991X_ACPI_MATCH, AK0991X_I2C_IDS, AK0991X_I2C_OF_MATCH,
    AKM_DRIVER_NAME,
};

/// 8-bit registers, 8-bit values
pub const AK0991X_I2C_REGMAP: RegmapConfig = RegmapConfig::new(8, 8);

#[derive(Debug, Default, Clone, Copy)]
pub struct Ak0991xI2cDriver {
    core: Ak0991xCore,
}

impl Ak0991xI2cDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Driver for Ak0991xI2cDriver {
    type Client = I2cClient;
    type Data = Ak0991xDevice;

    const NAME: &'static str = AKM_DRIVER_NAME;
    const TABLES: MatchTables = MatchTables::new(AK0991X_I2C_IDS)
        .with_of(AK0991X_I2C_OF_MATCH)
        .with_acpi(AK0991X_ACPI_MATCH);

    fn probe(
        &self,
        client: I2cClient,
        id: Option<&'static DeviceId>,
    ) -> Result<Ak0991xDevice, DriverError> {
        let dev = client.device_info();
        let Some(id) = id else {
            return Err(DriverError::NoDeviceId(dev.to_string()));
        };
        let irq = client.irq();

        let regmap =
            Regmap::init_i2c(client.adapter, client.addr, &AK0991X_I2C_REGMAP).inspect_err(|e| {
                error!(device = %dev.location, "i2c regmap initializing error: {}", e);
            })?;

        Ok(self.core.probe(&dev, regmap, irq, id.name)?)
    }

    fn remove(&self, data: Ak0991xDevice) -> Result<(), DriverError> {
        Ok(self.core.remove(data)?)
    }

    fn suspend(&self, data: &mut Ak0991xDevice) -> Result<(), DriverError> {
        Ok(self.core.suspend(data)?)
    }

    fn resume(&self, data: &mut Ak0991xDevice) -> Result<(), DriverError> {
        Ok(self.core.resume(data)?)
    }

    fn magnetometer<'a>(&self, data: &'a mut Ak0991xDevice) -> Option<&'a mut dyn Magnetometer> {
        Some(data)
    }
}
