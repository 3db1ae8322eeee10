//! AK0991X SPI bus driver

use akm_sensor::{Ak0991xCore, Ak0991xDevice, Magnetometer, SensorCore};
use akm_transport::{Regmap, RegmapConfig};
use tracing::error;

use crate::driver::{BusClient, Driver, SpiClient};
use crate::error::DriverError;
use crate::id_table::{
    DeviceId, MatchTables, AK0991X_ACPI_MATCH, AK0991X_SPI_IDS, AK0991X_SPI_OF_MATCH,
    AKM_DRIVER_NAME,
};

/// Fastest SPI clock the AK0991X parts accept
pub const MAX_SPI_FREQ_HZ: u32 = 2_500_000;

/// 8-bit registers, 8-bit values, bit 7 of the address byte selects a read
pub const AK0991X_SPI_REGMAP: RegmapConfig = RegmapConfig::new(8, 8).with_read_flag_mask(0x80);

#[derive(Debug, Default, Clone, Copy)]
pub struct Ak0991xSpiDriver {
    core: Ak0991xCore,
}

impl Ak0991xSpiDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Driver for Ak0991xSpiDriver {
    type Client = SpiClient;
    type Data = Ak0991xDevice;

    const NAME: &'static str = AKM_DRIVER_NAME;
    const TABLES: MatchTables = MatchTables::new(AK0991X_SPI_IDS)
        .with_of(AK0991X_SPI_OF_MATCH)
        .with_acpi(AK0991X_ACPI_MATCH);

    fn probe(
        &self,
        spi: SpiClient,
        id: Option<&'static DeviceId>,
    ) -> Result<Ak0991xDevice, DriverError> {
        let dev = spi.device_info();

        let hz = spi.max_speed_hz();
        if hz > MAX_SPI_FREQ_HZ {
            error!(device = %dev.location, "spi CLK {} Hz too fast", hz);
            return Err(DriverError::ClockTooFast {
                device: dev.location,
                hz,
                max: MAX_SPI_FREQ_HZ,
            });
        }

        let Some(id) = id else {
            return Err(DriverError::NoDeviceId(dev.to_string()));
        };
        let irq = spi.irq();

        let regmap = Regmap::init_spi(spi.device, &AK0991X_SPI_REGMAP).inspect_err(|e| {
            error!(device = %dev.location, "spi regmap initializing error: {}", e);
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
