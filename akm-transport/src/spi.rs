//! SPI device abstraction

use crate::error::BusError;

/// Standard SPI clock polarity/phase modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    #[default]
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl TryFrom<u8> for SpiMode {
    type Error = BusError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SpiMode::Mode0),
            1 => Ok(SpiMode::Mode1),
            2 => Ok(SpiMode::Mode2),
            3 => Ok(SpiMode::Mode3),
            other => Err(BusError::InvalidArgument(format!("SPI mode {other}"))),
        }
    }
}

/// A chip-select on an SPI controller
pub trait SpiBus: Send {
    /// Configured maximum clock rate in Hz
    fn max_speed_hz(&self) -> u32;

    fn mode(&self) -> SpiMode;

    /// Shift `tx` out, discarding what comes back
    fn write(&mut self, tx: &[u8]) -> Result<(), BusError>;

    /// Shift `tx` out, then clock in `rx.len()` bytes within one chip-select
    fn write_then_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError>;

    /// Device node path (e.g. `/dev/spidev0.0`)
    fn path(&self) -> &str;
}

impl SpiBus for Box<dyn SpiBus> {
    fn max_speed_hz(&self) -> u32 {
        (**self).max_speed_hz()
    }

    fn mode(&self) -> SpiMode {
        (**self).mode()
    }

    fn write(&mut self, tx: &[u8]) -> Result<(), BusError> {
        (**self).write(tx)
    }

    fn write_then_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError> {
        (**self).write_then_read(tx, rx)
    }

    fn path(&self) -> &str {
        (**self).path()
    }
}
