//! Bus clients and the driver contract
//!
//! A client is a device instantiated on a bus, the userspace counterpart of
//! `struct i2c_client` / `struct spi_device`. It owns its bus backend; when
//! a driver binds, `probe` takes the client and returns the driver data
//! that the registry keeps until `remove`.

use akm_sensor::Magnetometer;
use akm_transport::{DeviceInfo, I2cAdapter, SpiBus, SpiMode};

use crate::error::DriverError;
use crate::id_table::{DeviceId, MatchTables};

/// Properties every bus client exposes for matching and logging
pub trait BusClient: Send + 'static {
    /// Device name (modalias), matched against the bus id table
    fn name(&self) -> &str;
    fn compatible(&self) -> Option<&str>;
    fn acpi_id(&self) -> Option<&str>;
    fn irq(&self) -> Option<u32>;
    fn device_info(&self) -> DeviceInfo;
}

/// A device at one address on an I2C adapter
pub struct I2cClient {
    pub name: String,
    pub addr: u16,
    pub irq: Option<u32>,
    pub compatible: Option<String>,
    pub acpi_id: Option<String>,
    pub adapter: Box<dyn I2cAdapter>,
}

impl I2cClient {
    pub fn new(adapter: Box<dyn I2cAdapter>, addr: u16, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr,
            irq: None,
            compatible: None,
            acpi_id: None,
            adapter,
        }
    }

    pub fn with_irq(mut self, irq: u32) -> Self {
        self.irq = Some(irq);
        self
    }

    pub fn with_compatible(mut self, compatible: impl Into<String>) -> Self {
        self.compatible = Some(compatible.into());
        self
    }

    pub fn with_acpi_id(mut self, acpi_id: impl Into<String>) -> Self {
        self.acpi_id = Some(acpi_id.into());
        self
    }
}

impl BusClient for I2cClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn compatible(&self) -> Option<&str> {
        self.compatible.as_deref()
    }

    fn acpi_id(&self) -> Option<&str> {
        self.acpi_id.as_deref()
    }

    fn irq(&self) -> Option<u32> {
        self.irq
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::i2c(self.adapter.path(), self.addr, &self.name)
    }
}

/// A device behind one chip-select of an SPI controller
pub struct SpiClient {
    pub modalias: String,
    pub irq: Option<u32>,
    pub compatible: Option<String>,
    pub acpi_id: Option<String>,
    pub device: Box<dyn SpiBus>,
}

impl SpiClient {
    pub fn new(device: Box<dyn SpiBus>, modalias: impl Into<String>) -> Self {
        Self {
            modalias: modalias.into(),
            irq: None,
            compatible: None,
            acpi_id: None,
            device,
        }
    }

    pub fn with_irq(mut self, irq: u32) -> Self {
        self.irq = Some(irq);
        self
    }

    pub fn with_compatible(mut self, compatible: impl Into<String>) -> Self {
        self.compatible = Some(compatible.into());
        self
    }

    pub fn with_acpi_id(mut self, acpi_id: impl Into<String>) -> Self {
        self.acpi_id = Some(acpi_id.into());
        self
    }

    pub fn max_speed_hz(&self) -> u32 {
        self.device.max_speed_hz()
    }

    pub fn mode(&self) -> SpiMode {
        self.device.mode()
    }
}

impl BusClient for SpiClient {
    fn name(&self) -> &str {
        &self.modalias
    }

    fn compatible(&self) -> Option<&str> {
        self.compatible.as_deref()
    }

    fn acpi_id(&self) -> Option<&str> {
        self.acpi_id.as_deref()
    }

    fn irq(&self) -> Option<u32> {
        self.irq
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::spi(self.device.path(), &self.modalias)
    }
}

/// A bus driver
///
/// `probe` consumes the client; whatever it returns is the driver data,
/// handed back to `remove` and the power management hooks.
pub trait Driver: Send + Sync + 'static {
    type Client: BusClient;
    type Data: Send + 'static;

    const NAME: &'static str;
    const TABLES: MatchTables;

    /// Bind to a matched device
    ///
    /// `id` is the bus id table entry matching the device name, if any.
    fn probe(
        &self,
        client: Self::Client,
        id: Option<&'static DeviceId>,
    ) -> Result<Self::Data, DriverError>;

    fn remove(&self, data: Self::Data) -> Result<(), DriverError>;

    fn suspend(&self, _data: &mut Self::Data) -> Result<(), DriverError> {
        Ok(())
    }

    fn resume(&self, _data: &mut Self::Data) -> Result<(), DriverError> {
        Ok(())
    }

    /// The sensor behind the driver data, for userspace access
    fn magnetometer<'a>(&self, _data: &'a mut Self::Data) -> Option<&'a mut dyn Magnetometer> {
        None
    }
}

/// Driver for devices on an I2C adapter
pub trait I2cDriver: Driver<Client = I2cClient> {}

impl<D: Driver<Client = I2cClient>> I2cDriver for D {}

/// Driver for devices on an SPI controller
pub trait SpiDriver: Driver<Client = SpiClient> {}

impl<D: Driver<Client = SpiClient>> SpiDriver for D {}
