//! Instantiating bus clients from a board configuration
//!
//! With real hardware each entry opens its i2c-dev or spidev node. In
//! simulated mode each entry gets its own emulated chip, chosen from the
//! entry's `sim_chip`, `compatible` or `name`.

use std::sync::Arc;

use akm_sensor::{Ak0991xVariant, SimAk0991x, SimAk8963};
use akm_transport::{I2cAdapter, SimI2cAdapter, SimSpiDevice, SimTarget, SpiBus, SpiMode};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::{BoardConfig, I2cDeviceConfig, SpiDeviceConfig};
use crate::driver::{BusClient, I2cClient, SpiClient};
use crate::error::DriverError;
use crate::id_table::{AK8963_DRIVER_NAME, AKM_DRIVER_NAME};
use crate::registry::{DeviceHandle, DriverRegistry};

/// Chip emulated behind a simulated bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimChip {
    Ak0991x(Ak0991xVariant),
    Ak8963,
}

impl SimChip {
    fn parse(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        match model.rsplit(',').next()? {
            AK8963_DRIVER_NAME => Some(SimChip::Ak8963),
            // The generic family name gets the most common part
            AKM_DRIVER_NAME => Some(SimChip::Ak0991x(Ak0991xVariant::Ak09918)),
            part => Ak0991xVariant::from_compatible(part).map(SimChip::Ak0991x),
        }
    }

    /// Pick the chip for a board entry
    ///
    /// An explicit `sim_chip` must name a known part; otherwise the
    /// compatible string is tried before the device name.
    pub fn resolve(
        sim_chip: Option<&str>,
        compatible: Option<&str>,
        name: &str,
    ) -> Result<Self, DriverError> {
        if let Some(model) = sim_chip {
            return Self::parse(model)
                .ok_or_else(|| DriverError::Config(format!("unknown sim_chip \"{model}\"")));
        }
        compatible
            .and_then(Self::parse)
            .or_else(|| Self::parse(name))
            .ok_or_else(|| DriverError::Config(format!("cannot simulate device \"{name}\"")))
    }

    fn target(self) -> Arc<Mutex<dyn SimTarget>> {
        match self {
            SimChip::Ak0991x(variant) => Arc::new(Mutex::new(SimAk0991x::new(variant))),
            SimChip::Ak8963 => Arc::new(Mutex::new(SimAk8963::new())),
        }
    }
}

/// A client ready to be added to the registry
pub enum BoardDevice {
    I2c(I2cClient),
    Spi(SpiClient),
}

fn i2c_client(entry: &I2cDeviceConfig, simulate: bool) -> Result<I2cClient, DriverError> {
    let adapter: Box<dyn I2cAdapter> = if simulate {
        let chip = SimChip::resolve(
            entry.sim_chip.as_deref(),
            entry.compatible.as_deref(),
            &entry.name,
        )?;
        debug!("simulating {:?} on {}@0x{:02x}", chip, entry.adapter, entry.address);
        Box::new(SimI2cAdapter::new(
            entry.adapter.clone(),
            entry.address,
            chip.target(),
        ))
    } else {
        open_i2c(&entry.adapter)?
    };

    let mut client = I2cClient::new(adapter, entry.address, entry.name.clone());
    client.compatible = entry.compatible.clone();
    client.acpi_id = entry.acpi_id.clone();
    client.irq = entry.irq;
    Ok(client)
}

fn spi_client(entry: &SpiDeviceConfig, simulate: bool) -> Result<SpiClient, DriverError> {
    let mode = SpiMode::try_from(entry.mode)?;
    let device: Box<dyn SpiBus> = if simulate {
        let chip = SimChip::resolve(
            entry.sim_chip.as_deref(),
            entry.compatible.as_deref(),
            &entry.name,
        )?;
        debug!("simulating {:?} on {}", chip, entry.path);
        Box::new(
            SimSpiDevice::new(entry.path.clone(), entry.max_speed_hz, chip.target())
                .with_mode(mode),
        )
    } else {
        open_spi(&entry.path, entry.max_speed_hz, mode)?
    };

    let mut client = SpiClient::new(device, entry.name.clone());
    client.compatible = entry.compatible.clone();
    client.acpi_id = entry.acpi_id.clone();
    client.irq = entry.irq;
    Ok(client)
}

#[cfg(all(target_os = "linux", feature = "linux"))]
fn open_i2c(path: &str) -> Result<Box<dyn I2cAdapter>, DriverError> {
    Ok(Box::new(akm_transport::LinuxI2cAdapter::open(path)?))
}

#[cfg(not(all(target_os = "linux", feature = "linux")))]
fn open_i2c(path: &str) -> Result<Box<dyn I2cAdapter>, DriverError> {
    Err(DriverError::Config(format!(
        "{path}: hardware access needs Linux with the `linux` feature"
    )))
}

#[cfg(all(target_os = "linux", feature = "linux"))]
fn open_spi(
    path: &str,
    max_speed_hz: u32,
    mode: SpiMode,
) -> Result<Box<dyn SpiBus>, DriverError> {
    let config = akm_transport::SpiConfig::new(path)
        .with_speed(max_speed_hz)
        .with_mode(mode);
    Ok(Box::new(akm_transport::LinuxSpiDevice::open(&config)?))
}

#[cfg(not(all(target_os = "linux", feature = "linux")))]
fn open_spi(
    path: &str,
    _max_speed_hz: u32,
    _mode: SpiMode,
) -> Result<Box<dyn SpiBus>, DriverError> {
    Err(DriverError::Config(format!(
        "{path}: hardware access needs Linux with the `linux` feature"
    )))
}

/// Create a client for every board entry, I2C entries first
pub fn instantiate(board: &BoardConfig, simulate: bool) -> Result<Vec<BoardDevice>, DriverError> {
    let mut devices = Vec::with_capacity(board.device_count());
    for entry in &board.i2c {
        devices.push(BoardDevice::I2c(i2c_client(entry, simulate)?));
    }
    for entry in &board.spi {
        devices.push(BoardDevice::Spi(spi_client(entry, simulate)?));
    }
    Ok(devices)
}

/// Result of adding one board entry to the registry
pub struct Attach {
    pub location: String,
    pub result: Result<DeviceHandle, DriverError>,
}

/// Add every board device to the registry
///
/// A device that fails to bind does not stop the others; each outcome is
/// returned in board order.
pub fn attach_all(registry: &mut DriverRegistry, devices: Vec<BoardDevice>) -> Vec<Attach> {
    devices
        .into_iter()
        .map(|dev| {
            let (location, result) = match dev {
                BoardDevice::I2c(client) => {
                    let location = client.device_info().location;
                    (location, registry.add_i2c_device(client))
                }
                BoardDevice::Spi(client) => {
                    let location = client.device_info().location;
                    (location, registry.add_spi_device(client))
                }
            };
            if let Err(e) = &result {
                warn!(device = %location, "not bound: {}", e);
            }
            Attach { location, result }
        })
        .collect()
}
