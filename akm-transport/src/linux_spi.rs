//! SPI device backed by the Linux spidev interface (`/dev/spidevB.C`)

use std::path::PathBuf;

use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use tracing::debug;

use crate::error::BusError;
use crate::spi::{SpiBus, SpiMode};

/// Default clock when the board file does not specify one
pub const DEFAULT_SPI_SPEED_HZ: u32 = 1_000_000;

/// Settings applied to a spidev node when it is opened
#[derive(Debug, Clone)]
pub struct SpiConfig {
    pub path: PathBuf,
    pub max_speed_hz: u32,
    pub mode: SpiMode,
    pub bits_per_word: u8,
}

impl SpiConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_speed_hz: DEFAULT_SPI_SPEED_HZ,
            mode: SpiMode::Mode0,
            bits_per_word: 8,
        }
    }

    pub fn with_speed(mut self, hz: u32) -> Self {
        self.max_speed_hz = hz;
        self
    }

    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }
}

fn mode_flags(mode: SpiMode) -> SpiModeFlags {
    match mode {
        SpiMode::Mode0 => SpiModeFlags::SPI_MODE_0,
        SpiMode::Mode1 => SpiModeFlags::SPI_MODE_1,
        SpiMode::Mode2 => SpiModeFlags::SPI_MODE_2,
        SpiMode::Mode3 => SpiModeFlags::SPI_MODE_3,
    }
}

/// SPI device on a Linux spidev node
pub struct LinuxSpiDevice {
    spi: Spidev,
    config: SpiConfig,
    path: String,
}

impl LinuxSpiDevice {
    /// Open and configure a spidev node
    pub fn open(config: &SpiConfig) -> Result<Self, BusError> {
        let mut spi = Spidev::open(&config.path)?;
        let options = SpidevOptions::new()
            .bits_per_word(config.bits_per_word)
            .max_speed_hz(config.max_speed_hz)
            .mode(mode_flags(config.mode))
            .build();
        spi.configure(&options)?;

        debug!(
            "Opened SPI device {} at {} Hz {:?}",
            config.path.display(),
            config.max_speed_hz,
            config.mode
        );

        Ok(Self {
            spi,
            path: config.path.display().to_string(),
            config: config.clone(),
        })
    }
}

impl SpiBus for LinuxSpiDevice {
    fn max_speed_hz(&self) -> u32 {
        self.config.max_speed_hz
    }

    fn mode(&self) -> SpiMode {
        self.config.mode
    }

    fn write(&mut self, tx: &[u8]) -> Result<(), BusError> {
        let mut transfer = SpidevTransfer::write(tx);
        self.spi
            .transfer(&mut transfer)
            .map_err(|source| BusError::Transfer {
                op: "spi_write",
                source,
            })
    }

    fn write_then_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError> {
        let mut transfers = [SpidevTransfer::write(tx), SpidevTransfer::read(rx)];
        self.spi
            .transfer_multiple(&mut transfers)
            .map_err(|source| BusError::Transfer {
                op: "spi_write_then_read",
                source,
            })
    }

    fn path(&self) -> &str {
        &self.path
    }
}
