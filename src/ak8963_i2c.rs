//! AK8963 I2C bus driver

use akm_sensor::{Ak8963Core, Ak8963Device, Magnetometer, SensorCore};
use akm_transport::{BusOps, I2cAdapter, I2cBusOps, I2cFunctionality};
use tracing::error;

use crate::driver::{BusClient, Driver, I2cClient};
use crate::error::DriverError;
use crate::id_table::{DeviceId, MatchTables, AK8963_DRIVER_NAME, AK8963_I2C_IDS};

#[derive(Debug, Default, Clone, Copy)]
pub struct Ak8963I2cDriver {
    core: Ak8963Core,
}

impl Ak8963I2cDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Driver for Ak8963I2cDriver {
    type Client = I2cClient;
    type Data = Ak8963Device;

    const NAME: &'static str = AK8963_DRIVER_NAME;
    const TABLES: MatchTables = MatchTables::new(AK8963_I2C_IDS);

    fn probe(
        &self,
        client: I2cClient,
        _id: Option<&'static DeviceId>,
    ) -> Result<Ak8963Device, DriverError> {
        let dev = client.device_info();

        if !client
            .adapter
            .functionality()
            .contains(I2cFunctionality::I2C)
        {
            error!(device = %dev.location, "probe: check_functionality failed.");
            return Err(DriverError::MissingFunctionality {
                device: dev.location,
                missing: "I2C_FUNC_I2C",
            });
        }

        let irq = client.irq();
        let ops: Box<dyn BusOps> = Box::new(I2cBusOps::new(client.adapter, client.addr));
        Ok(self.core.probe(&dev, ops, irq, AK8963_DRIVER_NAME)?)
    }

    fn remove(&self, data: Ak8963Device) -> Result<(), DriverError> {
        Ok(self.core.remove(data)?)
    }

    fn suspend(&self, data: &mut Ak8963Device) -> Result<(), DriverError> {
        Ok(self.core.suspend(data)?)
    }

    fn resume(&self, data: &mut Ak8963Device) -> Result<(), DriverError> {
        Ok(self.core.resume(data)?)
    }

    fn magnetometer<'a>(&self, data: &'a mut Ak8963Device) -> Option<&'a mut dyn Magnetometer> {
        Some(data)
    }
}
