//! Driver registry: matching, binding and power management
//!
//! This plays the part of the driver core. Drivers are registered once;
//! each device added afterwards is matched against them in registration
//! order and probed by the first driver whose tables accept it. Bound
//! devices are suspended in reverse bind order and resumed in bind order.

use std::fmt;
use std::sync::Arc;

use akm_sensor::Magnetometer;
use akm_transport::{BusType, DeviceInfo};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::driver::{BusClient, Driver, I2cClient, I2cDriver, SpiClient, SpiDriver};
use crate::error::DriverError;
use crate::id_table::{match_id, DeviceId, MatchSource, MatchTables};

/// Driver registered for one bus, with its data type erased
trait Binder<C>: Send + Sync {
    fn name(&self) -> &'static str;
    fn tables(&self) -> MatchTables;
    fn bind(
        &self,
        client: C,
        id: Option<&'static DeviceId>,
    ) -> Result<Box<dyn Binding>, DriverError>;
}

/// A driver bound to one device, holding its driver data
trait Binding: Send {
    fn remove(self: Box<Self>) -> Result<(), DriverError>;
    fn suspend(&mut self) -> Result<(), DriverError>;
    fn resume(&mut self) -> Result<(), DriverError>;
    fn magnetometer(&mut self) -> Option<&mut dyn Magnetometer>;
}

struct DriverEntry<D>(Arc<D>);

impl<D: Driver> Binder<D::Client> for DriverEntry<D> {
    fn name(&self) -> &'static str {
        D::NAME
    }

    fn tables(&self) -> MatchTables {
        D::TABLES
    }

    fn bind(
        &self,
        client: D::Client,
        id: Option<&'static DeviceId>,
    ) -> Result<Box<dyn Binding>, DriverError> {
        let data = self.0.probe(client, id)?;
        Ok(Box::new(Bound {
            driver: Arc::clone(&self.0),
            data,
        }))
    }
}

struct Bound<D: Driver> {
    driver: Arc<D>,
    data: D::Data,
}

impl<D: Driver> Binding for Bound<D> {
    fn remove(self: Box<Self>) -> Result<(), DriverError> {
        let Bound { driver, data } = *self;
        driver.remove(data)
    }

    fn suspend(&mut self) -> Result<(), DriverError> {
        self.driver.suspend(&mut self.data)
    }

    fn resume(&mut self) -> Result<(), DriverError> {
        self.driver.resume(&mut self.data)
    }

    fn magnetometer(&mut self) -> Option<&mut dyn Magnetometer> {
        self.driver.magnetometer(&mut self.data)
    }
}

/// Handle to a bound device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceHandle(usize);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// A registered driver as listed by [`DriverRegistry::drivers`]
#[derive(Debug, Clone, Serialize)]
pub struct DriverSummary {
    pub bus: BusType,
    pub name: &'static str,
    pub tables: MatchTables,
}

/// A bound device as listed by [`DriverRegistry::devices`]
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub handle: DeviceHandle,
    pub info: DeviceInfo,
    pub driver: &'static str,
    pub matched_by: MatchSource,
    pub irq: Option<u32>,
    pub suspended: bool,
}

struct BoundDevice {
    handle: DeviceHandle,
    info: DeviceInfo,
    driver: &'static str,
    matched_by: MatchSource,
    irq: Option<u32>,
    suspended: bool,
    binding: Box<dyn Binding>,
}

impl BoundDevice {
    fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            handle: self.handle,
            info: self.info.clone(),
            driver: self.driver,
            matched_by: self.matched_by,
            irq: self.irq,
            suspended: self.suspended,
        }
    }
}

/// Matches devices to drivers and owns their driver data
#[derive(Default)]
pub struct DriverRegistry {
    i2c_drivers: Vec<Box<dyn Binder<I2cClient>>>,
    spi_drivers: Vec<Box<dyn Binder<SpiClient>>>,
    devices: Vec<BoundDevice>,
    next_handle: usize,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_i2c_driver<D: I2cDriver>(&mut self, driver: D) {
        debug!("registered i2c driver {}", D::NAME);
        self.i2c_drivers.push(Box::new(DriverEntry(Arc::new(driver))));
    }

    pub fn register_spi_driver<D: SpiDriver>(&mut self, driver: D) {
        debug!("registered spi driver {}", D::NAME);
        self.spi_drivers.push(Box::new(DriverEntry(Arc::new(driver))));
    }

    /// All registered drivers, I2C first
    pub fn drivers(&self) -> Vec<DriverSummary> {
        let i2c = self.i2c_drivers.iter().map(|d| DriverSummary {
            bus: BusType::I2c,
            name: d.name(),
            tables: d.tables(),
        });
        let spi = self.spi_drivers.iter().map(|d| DriverSummary {
            bus: BusType::Spi,
            name: d.name(),
            tables: d.tables(),
        });
        i2c.chain(spi).collect()
    }

    /// Instantiate an I2C device and bind it to the first matching driver
    pub fn add_i2c_device(&mut self, client: I2cClient) -> Result<DeviceHandle, DriverError> {
        let bound = attach(&self.i2c_drivers, client, self.next_handle)?;
        Ok(self.insert(bound))
    }

    /// Instantiate an SPI device and bind it to the first matching driver
    pub fn add_spi_device(&mut self, client: SpiClient) -> Result<DeviceHandle, DriverError> {
        let bound = attach(&self.spi_drivers, client, self.next_handle)?;
        Ok(self.insert(bound))
    }

    fn insert(&mut self, bound: BoundDevice) -> DeviceHandle {
        let handle = bound.handle;
        self.next_handle += 1;
        self.devices.push(bound);
        handle
    }

    /// Unbind a device, calling its driver's `remove`
    pub fn remove_device(&mut self, handle: DeviceHandle) -> Result<(), DriverError> {
        let pos = self
            .devices
            .iter()
            .position(|d| d.handle == handle)
            .ok_or_else(|| DriverError::NotBound(handle.to_string()))?;
        let dev = self.devices.remove(pos);
        unbind(dev)
    }

    /// Suspend every bound device, last bound first
    ///
    /// On failure the devices suspended by this call are resumed again and
    /// the error is returned. A device whose resume also fails stays
    /// suspended.
    pub fn suspend_all(&mut self) -> Result<(), DriverError> {
        let mut suspended = Vec::new();
        for idx in (0..self.devices.len()).rev() {
            let dev = &mut self.devices[idx];
            if dev.suspended {
                continue;
            }
            if let Err(e) = dev.binding.suspend() {
                error!(device = %dev.info.location, "{}: suspend failed: {}", dev.driver, e);
                for &done in suspended.iter().rev() {
                    let dev: &mut BoundDevice = &mut self.devices[done];
                    match dev.binding.resume() {
                        Ok(()) => dev.suspended = false,
                        Err(e) => warn!(
                            device = %dev.info.location,
                            "resume after aborted suspend failed: {}", e
                        ),
                    }
                }
                return Err(e);
            }
            dev.suspended = true;
            suspended.push(idx);
        }
        info!("suspended {} device(s)", suspended.len());
        Ok(())
    }

    /// Resume every suspended device, first bound first
    ///
    /// All devices are attempted; the first error is returned.
    pub fn resume_all(&mut self) -> Result<(), DriverError> {
        let mut first_err = None;
        let mut resumed = 0;
        for dev in self.devices.iter_mut().filter(|d| d.suspended) {
            match dev.binding.resume() {
                Ok(()) => {
                    dev.suspended = false;
                    resumed += 1;
                }
                Err(e) => {
                    error!(device = %dev.info.location, "{}: resume failed: {}", dev.driver, e);
                    first_err.get_or_insert(e);
                }
            }
        }
        info!("resumed {} device(s)", resumed);
        first_err.map_or(Ok(()), Err)
    }

    /// Unbind every device, last bound first
    pub fn shutdown(&mut self) -> Result<(), DriverError> {
        let mut first_err = None;
        while let Some(dev) = self.devices.pop() {
            if let Err(e) = unbind(dev) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn devices(&self) -> Vec<DeviceSummary> {
        self.devices.iter().map(BoundDevice::summary).collect()
    }

    pub fn device(&self, handle: DeviceHandle) -> Option<DeviceSummary> {
        self.devices
            .iter()
            .find(|d| d.handle == handle)
            .map(BoundDevice::summary)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The sensor behind a bound device
    pub fn magnetometer(&mut self, handle: DeviceHandle) -> Option<&mut dyn Magnetometer> {
        self.devices
            .iter_mut()
            .find(|d| d.handle == handle)
            .and_then(|d| d.binding.magnetometer())
    }

    /// Every bound sensor, in bind order
    pub fn magnetometers(&mut self) -> impl Iterator<Item = (DeviceHandle, &mut dyn Magnetometer)> {
        self.devices.iter_mut().filter_map(|d| {
            let handle = d.handle;
            d.binding.magnetometer().map(|m| (handle, m))
        })
    }
}

impl Drop for DriverRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("unbinding devices on drop: {}", e);
        }
    }
}

fn attach<C: BusClient>(
    drivers: &[Box<dyn Binder<C>>],
    client: C,
    next_handle: usize,
) -> Result<BoundDevice, DriverError> {
    let info = client.device_info();
    let irq = client.irq();

    let matched = drivers.iter().find_map(|d| {
        d.tables()
            .match_device(client.name(), client.compatible(), client.acpi_id())
            .map(|source| (d, source))
    });
    let Some((driver, matched_by)) = matched else {
        debug!(device = %info.location, "no driver for {}", info.name);
        return Err(DriverError::NoDriver(info.to_string()));
    };

    let id = match_id(driver.tables().ids, client.name());
    debug!(
        device = %info.location,
        "{} matched by {} (id {:?})",
        driver.name(),
        matched_by,
        id.map(|id| id.name)
    );

    let binding = driver.bind(client, id).inspect_err(|e| {
        error!(device = %info.location, "{}: probe failed: {} ({})", driver.name(), e, e.errno());
    })?;

    info!(device = %info.location, "bound to {}", driver.name());
    Ok(BoundDevice {
        handle: DeviceHandle(next_handle),
        info,
        driver: driver.name(),
        matched_by,
        irq,
        suspended: false,
        binding,
    })
}

fn unbind(dev: BoundDevice) -> Result<(), DriverError> {
    debug!(device = %dev.info.location, "unbinding {}", dev.driver);
    dev.binding.remove().inspect_err(|e| {
        error!(device = %dev.info.location, "{}: remove failed: {}", dev.driver, e);
    })
}
