//! Device ID tables and matching
//!
//! Each driver publishes a bus id table (matched on the device name), and
//! optionally an OF compatible table and an ACPI id table. Matching follows
//! the Linux driver core: OF first, then ACPI, then the bus id table.
//!
//! The id handed to `probe` always comes from the bus id table, looked up by
//! device name, even when the device was matched through OF or ACPI.

use serde::Serialize;
use std::fmt;

/// Module name of the AK0991X bus drivers
pub const AKM_DRIVER_NAME: &str = "ak0991x";

/// Module name of the AK8963 bus driver
pub const AK8963_DRIVER_NAME: &str = "ak8963";

/// Bus id table entry (`i2c_device_id` / `spi_device_id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceId {
    pub name: &'static str,
    pub driver_data: usize,
}

impl DeviceId {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            driver_data: 0,
        }
    }
}

/// Open Firmware compatible entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OfDeviceId {
    pub compatible: &'static str,
}

impl OfDeviceId {
    pub const fn new(compatible: &'static str) -> Self {
        Self { compatible }
    }
}

/// ACPI hardware id entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcpiDeviceId {
    pub id: &'static str,
    pub driver_data: usize,
}

impl AcpiDeviceId {
    pub const fn new(id: &'static str) -> Self {
        Self { id, driver_data: 0 }
    }
}

pub const AK0991X_I2C_IDS: &[DeviceId] = &[DeviceId::new(AKM_DRIVER_NAME)];

pub const AK0991X_I2C_OF_MATCH: &[OfDeviceId] = &[
    OfDeviceId::new("asahi-kasei,ak09915"),
    OfDeviceId::new("asahi-kasei,ak09915d"),
    OfDeviceId::new("asahi-kasei,ak09916"),
    OfDeviceId::new("asahi-kasei,ak09916d"),
    OfDeviceId::new("asahi-kasei,ak09917d"),
    OfDeviceId::new("asahi-kasei,ak09918"),
    OfDeviceId::new("asahi-kasei,ak09919"),
];

pub const AK0991X_SPI_IDS: &[DeviceId] = &[DeviceId::new(AKM_DRIVER_NAME)];

// Only the parts with an SPI interface
pub const AK0991X_SPI_OF_MATCH: &[OfDeviceId] = &[
    OfDeviceId::new("asahi-kasei,ak09915"),
    OfDeviceId::new("asahi-kasei,ak09915d"),
    OfDeviceId::new("asahi-kasei,ak09917d"),
];

pub const AK0991X_ACPI_MATCH: &[AcpiDeviceId] = &[AcpiDeviceId::new(AKM_DRIVER_NAME)];

pub const AK8963_I2C_IDS: &[DeviceId] = &[DeviceId::new(AK8963_DRIVER_NAME)];

/// How a device was matched to a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Of,
    Acpi,
    IdTable,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Of => write!(f, "of"),
            MatchSource::Acpi => write!(f, "acpi"),
            MatchSource::IdTable => write!(f, "id-table"),
        }
    }
}

/// The tables a driver matches devices against
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchTables {
    pub ids: &'static [DeviceId],
    pub of: &'static [OfDeviceId],
    pub acpi: &'static [AcpiDeviceId],
}

impl MatchTables {
    pub const fn new(ids: &'static [DeviceId]) -> Self {
        Self {
            ids,
            of: &[],
            acpi: &[],
        }
    }

    pub const fn with_of(mut self, of: &'static [OfDeviceId]) -> Self {
        self.of = of;
        self
    }

    pub const fn with_acpi(mut self, acpi: &'static [AcpiDeviceId]) -> Self {
        self.acpi = acpi;
        self
    }

    /// Decide whether a device binds to this driver, and through which table
    pub fn match_device(
        &self,
        name: &str,
        compatible: Option<&str>,
        acpi_id: Option<&str>,
    ) -> Option<MatchSource> {
        if of_match(self.of, compatible).is_some() {
            return Some(MatchSource::Of);
        }
        if acpi_match(self.acpi, acpi_id).is_some() {
            return Some(MatchSource::Acpi);
        }
        match_id(self.ids, name).map(|_| MatchSource::IdTable)
    }
}

/// Look up a device name in a bus id table
pub fn match_id(table: &'static [DeviceId], name: &str) -> Option<&'static DeviceId> {
    table.iter().find(|id| id.name == name)
}

pub fn of_match(
    table: &'static [OfDeviceId],
    compatible: Option<&str>,
) -> Option<&'static OfDeviceId> {
    let compatible = compatible?;
    table.iter().find(|id| id.compatible == compatible)
}

pub fn acpi_match(
    table: &'static [AcpiDeviceId],
    acpi_id: Option<&str>,
) -> Option<&'static AcpiDeviceId> {
    let acpi_id = acpi_id?;
    table.iter().find(|id| id.id == acpi_id)
}
