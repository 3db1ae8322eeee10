//! Board configuration
//!
//! A board file lists the devices present on the system, the way a device
//! tree or ACPI table would. Each entry becomes one bus client.
//!
//! ```toml
//! [[i2c]]
//! adapter = "/dev/i2c-1"
//! address = 0x0c
//! name = "ak0991x"
//! compatible = "asahi-kasei,ak09918"
//! irq = 23
//!
//! [[spi]]
//! path = "/dev/spidev0.0"
//! name = "ak0991x"
//! max_speed_hz = 2500000
//! compatible = "asahi-kasei,ak09915"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::DriverError;

/// SPI clock used when a board entry gives none
pub const DEFAULT_MAX_SPEED_HZ: u32 = 1_000_000;

/// One device on an I2C adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct I2cDeviceConfig {
    /// i2c-dev node of the adapter
    pub adapter: String,
    /// 7-bit slave address
    pub address: u16,
    /// Device name, matched against driver id tables
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acpi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irq: Option<u32>,
    /// Chip model to emulate when running simulated (e.g. `"ak09916d"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim_chip: Option<String>,
}

/// One device behind an SPI chip-select
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpiDeviceConfig {
    /// spidev node
    pub path: String,
    pub name: String,
    #[serde(default = "default_max_speed")]
    pub max_speed_hz: u32,
    /// Clock polarity/phase mode, 0-3
    #[serde(default)]
    pub mode: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acpi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irq: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim_chip: Option<String>,
}

fn default_max_speed() -> u32 {
    DEFAULT_MAX_SPEED_HZ
}

/// Every device on the board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    #[serde(default)]
    pub i2c: Vec<I2cDeviceConfig>,
    #[serde(default)]
    pub spi: Vec<SpiDeviceConfig>,
}

impl BoardConfig {
    /// Board file used when none is given on the command line
    pub fn default_path() -> PathBuf {
        PathBuf::from("/etc/akm/board.toml")
    }

    /// Load and validate a board file
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
            .map_err(|e| DriverError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        let config: BoardConfig =
            toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, DriverError> {
        toml::to_string_pretty(self).map_err(|e| DriverError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        for (i, dev) in self.i2c.iter().enumerate() {
            if dev.adapter.is_empty() {
                return Err(DriverError::Config(format!("i2c[{i}]: empty adapter path")));
            }
            if dev.address > 0x7f {
                return Err(DriverError::Config(format!(
                    "i2c[{i}]: address 0x{:x} is not a 7-bit address",
                    dev.address
                )));
            }
            if dev.name.trim().is_empty() {
                return Err(DriverError::Config(format!("i2c[{i}]: empty device name")));
            }
        }
        for (i, dev) in self.spi.iter().enumerate() {
            if dev.path.is_empty() {
                return Err(DriverError::Config(format!("spi[{i}]: empty device path")));
            }
            if dev.name.trim().is_empty() {
                return Err(DriverError::Config(format!("spi[{i}]: empty device name")));
            }
            if dev.mode > 3 {
                return Err(DriverError::Config(format!(
                    "spi[{i}]: mode {} out of range 0-3",
                    dev.mode
                )));
            }
            if dev.max_speed_hz == 0 {
                return Err(DriverError::Config(format!("spi[{i}]: max_speed_hz is zero")));
            }
        }
        Ok(())
    }

    pub fn device_count(&self) -> usize {
        self.i2c.len() + self.spi.len()
    }

    /// Demo board for simulated runs: one of each supported bus binding
    pub fn demo() -> Self {
        Self {
            i2c: vec![
                I2cDeviceConfig {
                    adapter: "/dev/i2c-sim0".into(),
                    address: 0x0c,
                    name: "ak0991x".into(),
                    compatible: Some("asahi-kasei,ak09918".into()),
                    acpi_id: None,
                    irq: None,
                    sim_chip: None,
                },
                I2cDeviceConfig {
                    adapter: "/dev/i2c-sim1".into(),
                    address: 0x0c,
                    name: "ak8963".into(),
                    compatible: None,
                    acpi_id: None,
                    irq: None,
                    sim_chip: None,
                },
            ],
            spi: vec![SpiDeviceConfig {
                path: "/dev/spidev-sim0.0".into(),
                name: "ak0991x".into(),
                max_speed_hz: 2_500_000,
                mode: 0,
                compatible: Some("asahi-kasei,ak09915".into()),
                acpi_id: None,
                irq: None,
                sim_chip: None,
            }],
        }
    }
}
