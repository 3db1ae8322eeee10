//! Register map over I2C or SPI
//!
//! A small counterpart of the kernel `regmap` API, limited to what AKM parts
//! need: 8-bit register addresses, 8-bit values, auto-incrementing bulk
//! access. The register address byte is formatted once here and the bus
//! backend only moves bytes.

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::BusError;
use crate::i2c::{I2cAdapter, I2cFunctionality, I2cMsg, SMBUS_BLOCK_MAX};
use crate::spi::SpiBus;
use crate::types::BusType;

/// Register layout of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegmapConfig {
    pub reg_bits: u8,
    pub val_bits: u8,
    /// OR-ed into the register byte for reads
    pub read_flag_mask: u8,
    /// Highest valid register, `None` for the full address space
    pub max_register: Option<u8>,
}

impl RegmapConfig {
    pub const fn new(reg_bits: u8, val_bits: u8) -> Self {
        Self {
            reg_bits,
            val_bits,
            read_flag_mask: 0,
            max_register: None,
        }
    }

    pub const fn with_read_flag_mask(mut self, mask: u8) -> Self {
        self.read_flag_mask = mask;
        self
    }

    pub const fn with_max_register(mut self, reg: u8) -> Self {
        self.max_register = Some(reg);
        self
    }

    fn validate(&self) -> Result<(), BusError> {
        if self.reg_bits != 8 || self.val_bits != 8 {
            return Err(BusError::InvalidArgument(format!(
                "unsupported regmap format {}/{} bits",
                self.reg_bits, self.val_bits
            )));
        }
        Ok(())
    }
}

/// Byte mover underneath a [`Regmap`]
pub trait RegmapBus: Send {
    /// Write a formatted register byte followed by values
    fn write(&mut self, data: &[u8]) -> Result<(), BusError>;

    /// Send the formatted register byte and read `val.len()` bytes back
    fn read(&mut self, reg: &[u8], val: &mut [u8]) -> Result<(), BusError>;

    fn bus_type(&self) -> BusType;
}

/// I2C backend: reads are one combined write+read transaction
struct I2cRegmapBus<A> {
    adapter: A,
    addr: u16,
}

impl<A: I2cAdapter> RegmapBus for I2cRegmapBus<A> {
    fn write(&mut self, data: &[u8]) -> Result<(), BusError> {
        let mut msgs = [I2cMsg::write(self.addr, data)];
        let done = self.adapter.transfer(&mut msgs)?;
        if done != msgs.len() {
            return Err(BusError::ShortTransfer {
                op: "regmap_i2c_write",
                expected: msgs.len(),
                actual: done,
            });
        }
        Ok(())
    }

    fn read(&mut self, reg: &[u8], val: &mut [u8]) -> Result<(), BusError> {
        let mut msgs = [I2cMsg::write(self.addr, reg), I2cMsg::read(self.addr, val)];
        let done = self.adapter.transfer(&mut msgs)?;
        if done != msgs.len() {
            return Err(BusError::ShortTransfer {
                op: "regmap_i2c_read",
                expected: msgs.len(),
                actual: done,
            });
        }
        Ok(())
    }

    fn bus_type(&self) -> BusType {
        BusType::I2c
    }
}

/// SMBus backend using I2C block transfers of up to [`SMBUS_BLOCK_MAX`] bytes
struct SmbusBlockRegmapBus<A> {
    adapter: A,
    addr: u16,
}

impl<A: I2cAdapter> RegmapBus for SmbusBlockRegmapBus<A> {
    fn write(&mut self, data: &[u8]) -> Result<(), BusError> {
        let Some((&reg, values)) = data.split_first() else {
            return Err(BusError::InvalidArgument("empty regmap write".into()));
        };
        for (i, chunk) in values.chunks(SMBUS_BLOCK_MAX).enumerate() {
            let command = reg.wrapping_add((i * SMBUS_BLOCK_MAX) as u8);
            self.adapter.smbus_write_i2c_block_data(self.addr, command, chunk)?;
        }
        Ok(())
    }

    fn read(&mut self, reg: &[u8], val: &mut [u8]) -> Result<(), BusError> {
        let Some(&reg) = reg.first() else {
            return Err(BusError::InvalidArgument("empty regmap register".into()));
        };
        for (i, chunk) in val.chunks_mut(SMBUS_BLOCK_MAX).enumerate() {
            let command = reg.wrapping_add((i * SMBUS_BLOCK_MAX) as u8);
            self.adapter.smbus_read_i2c_block_data(self.addr, command, chunk)?;
        }
        Ok(())
    }

    fn bus_type(&self) -> BusType {
        BusType::I2c
    }
}

/// SMBus backend moving one register per byte-data command
struct SmbusByteRegmapBus<A> {
    adapter: A,
    addr: u16,
}

impl<A: I2cAdapter> RegmapBus for SmbusByteRegmapBus<A> {
    fn write(&mut self, data: &[u8]) -> Result<(), BusError> {
        let Some((&reg, values)) = data.split_first() else {
            return Err(BusError::InvalidArgument("empty regmap write".into()));
        };
        for (i, &value) in values.iter().enumerate() {
            self.adapter.smbus_write_byte_data(self.addr, reg.wrapping_add(i as u8), value)?;
        }
        Ok(())
    }

    fn read(&mut self, reg: &[u8], val: &mut [u8]) -> Result<(), BusError> {
        let Some(&reg) = reg.first() else {
            return Err(BusError::InvalidArgument("empty regmap register".into()));
        };
        for (i, byte) in val.iter_mut().enumerate() {
            *byte = self.adapter.smbus_read_byte_data(self.addr, reg.wrapping_add(i as u8))?;
        }
        Ok(())
    }

    fn bus_type(&self) -> BusType {
        BusType::I2c
    }
}

struct SpiRegmapBus<D> {
    dev: D,
}

impl<D: SpiBus> RegmapBus for SpiRegmapBus<D> {
    fn write(&mut self, data: &[u8]) -> Result<(), BusError> {
        self.dev.write(data)
    }

    fn read(&mut self, reg: &[u8], val: &mut [u8]) -> Result<(), BusError> {
        self.dev.write_then_read(reg, val)
    }

    fn bus_type(&self) -> BusType {
        BusType::Spi
    }
}

/// Register access handle
///
/// Access is serialized internally, so a `Regmap` can be shared between
/// threads behind an `Arc`.
pub struct Regmap {
    bus: Mutex<Box<dyn RegmapBus>>,
    config: RegmapConfig,
}

impl Regmap {
    /// Build a register map on top of an arbitrary bus backend
    pub fn new(bus: Box<dyn RegmapBus>, config: &RegmapConfig) -> Result<Self, BusError> {
        config.validate()?;
        Ok(Self {
            bus: Mutex::new(bus),
            config: *config,
        })
    }

    /// Register map for an I2C slave at `addr`
    ///
    /// Plain I2C combined transfers are used when the adapter has them.
    /// Otherwise SMBus I2C block commands, then SMBus byte-data commands.
    pub fn init_i2c<A>(adapter: A, addr: u16, config: &RegmapConfig) -> Result<Self, BusError>
    where
        A: I2cAdapter + 'static,
    {
        if addr > 0x7f {
            return Err(BusError::InvalidArgument(format!(
                "I2C address 0x{addr:x} out of 7-bit range"
            )));
        }
        let funcs = adapter.functionality();
        let bus: Box<dyn RegmapBus> = if funcs.contains(I2cFunctionality::I2C) {
            Box::new(I2cRegmapBus { adapter, addr })
        } else if funcs.contains(I2cFunctionality::SMBUS_I2C_BLOCK) {
            debug!("{}: regmap over SMBus I2C block", adapter.path());
            Box::new(SmbusBlockRegmapBus { adapter, addr })
        } else if funcs.contains(I2cFunctionality::SMBUS_BYTE_DATA) {
            debug!("{}: regmap over SMBus byte data", adapter.path());
            Box::new(SmbusByteRegmapBus { adapter, addr })
        } else {
            return Err(BusError::Unsupported(format!(
                "{} has neither I2C nor SMBus register access ({:?})",
                adapter.path(),
                funcs
            )));
        };
        Self::new(bus, config)
    }

    /// Register map for an SPI device
    pub fn init_spi<D>(dev: D, config: &RegmapConfig) -> Result<Self, BusError>
    where
        D: SpiBus + 'static,
    {
        Self::new(Box::new(SpiRegmapBus { dev }), config)
    }

    pub fn config(&self) -> &RegmapConfig {
        &self.config
    }

    pub fn bus_type(&self) -> BusType {
        self.bus.lock().bus_type()
    }

    fn check_range(&self, reg: u8, count: usize) -> Result<(), BusError> {
        if count == 0 {
            return Err(BusError::InvalidArgument("zero-length access".into()));
        }
        let last = reg as usize + count - 1;
        let max = self.config.max_register.map_or(0xff, usize::from);
        if last > max {
            return Err(BusError::InvalidArgument(format!(
                "register range 0x{reg:02x}..=0x{last:02x} exceeds max 0x{max:02x}"
            )));
        }
        Ok(())
    }

    /// Read one register
    pub fn read(&self, reg: u8) -> Result<u8, BusError> {
        let mut val = [0u8; 1];
        self.bulk_read(reg, &mut val)?;
        Ok(val[0])
    }

    /// Write one register
    pub fn write(&self, reg: u8, val: u8) -> Result<(), BusError> {
        self.bulk_write(reg, &[val])
    }

    /// Read consecutive registers starting at `reg`
    pub fn bulk_read(&self, reg: u8, val: &mut [u8]) -> Result<(), BusError> {
        self.check_range(reg, val.len())?;
        let formatted = [reg | self.config.read_flag_mask];
        self.bus.lock().read(&formatted, val)?;
        trace!("regmap read 0x{:02x}: {:02x?}", reg, val);
        Ok(())
    }

    /// Write consecutive registers starting at `reg`
    pub fn bulk_write(&self, reg: u8, val: &[u8]) -> Result<(), BusError> {
        self.check_range(reg, val.len())?;
        let mut buf = Vec::with_capacity(val.len() + 1);
        buf.push(reg);
        buf.extend_from_slice(val);
        trace!("regmap write 0x{:02x}: {:02x?}", reg, val);
        self.bus.lock().write(&buf)
    }

    /// Read-modify-write the bits selected by `mask`
    ///
    /// The write is skipped when the register already holds the value.
    pub fn update_bits(&self, reg: u8, mask: u8, val: u8) -> Result<bool, BusError> {
        let old = self.read(reg)?;
        let new = (old & !mask) | (val & mask);
        if new == old {
            return Ok(false);
        }
        self.write(reg, new)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RegisterFile, SimI2cAdapter, SimSpiDevice};
    use std::sync::Arc;

    fn i2c_regmap() -> (Regmap, Arc<Mutex<RegisterFile>>) {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone());
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();
        (regmap, chip)
    }

    #[test]
    fn test_rejects_non_8bit_format() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip);
        let err = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(16, 8))
            .err()
            .unwrap();
        assert_eq!(err.errno(), -libc::EINVAL);
    }

    #[test]
    fn test_i2c_without_register_access_is_unsupported() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip)
            .with_functionality(I2cFunctionality::TEN_BIT_ADDR);
        let err = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8))
            .err()
            .unwrap();
        assert!(matches!(err, BusError::Unsupported(_)));
        assert_eq!(err.errno(), -libc::EOPNOTSUPP);
    }

    #[test]
    fn test_smbus_block_fallback_splits_long_reads() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        for reg in 0..40u8 {
            chip.lock().set(reg, reg ^ 0x5a);
        }
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone()).with_functionality(
            I2cFunctionality::SMBUS_I2C_BLOCK.union(I2cFunctionality::SMBUS_BYTE_DATA),
        );
        let control = adapter.control();
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();
        assert_eq!(regmap.bus_type(), BusType::I2c);

        let mut buf = [0u8; 40];
        regmap.bulk_read(0x00, &mut buf).unwrap();
        assert!(buf.iter().enumerate().all(|(i, &b)| b == i as u8 ^ 0x5a));

        let log = control.transactions();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0][0].data, vec![0x00]);
        assert_eq!(log[0][1].len, SMBUS_BLOCK_MAX);
        assert_eq!(log[1][0].data, vec![0x20]);
        assert_eq!(log[1][1].len, 8);

        control.clear();
        regmap.bulk_write(0x31, &[0x01, 0x02]).unwrap();
        assert_eq!(chip.lock().get(0x31), 0x01);
        assert_eq!(chip.lock().get(0x32), 0x02);
        assert_eq!(control.transactions().len(), 1);
    }

    #[test]
    fn test_smbus_byte_fallback_moves_one_register_per_command() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        chip.lock().set(0x00, 0x48);
        chip.lock().set(0x01, 0x0c);
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone())
            .with_functionality(I2cFunctionality::SMBUS_BYTE_DATA);
        let control = adapter.control();
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();

        let mut wia = [0u8; 2];
        regmap.bulk_read(0x00, &mut wia).unwrap();
        assert_eq!(wia, [0x48, 0x0c]);
        regmap.bulk_write(0x30, &[0x0a, 0x0b]).unwrap();
        assert_eq!(chip.lock().get(0x30), 0x0a);
        assert_eq!(chip.lock().get(0x31), 0x0b);

        let log = control.transactions();
        assert_eq!(log.len(), 4);
        assert_eq!(log[1][0].data, vec![0x01]);
        assert_eq!(log[1][1].len, 1);
        assert_eq!(log[3][0].data, vec![0x31, 0x0b]);
    }

    #[test]
    fn test_plain_i2c_preferred_over_smbus() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip);
        let control = adapter.control();
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();

        let mut buf = [0u8; 40];
        regmap.bulk_read(0x00, &mut buf).unwrap();
        let log = control.transactions();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0][1].len, 40);
    }

    #[test]
    fn test_i2c_read_write() {
        let (regmap, chip) = i2c_regmap();
        regmap.write(0x31, 0x08).unwrap();
        assert_eq!(chip.lock().get(0x31), 0x08);

        chip.lock().set(0x00, 0x48);
        chip.lock().set(0x01, 0x0c);
        let mut wia = [0u8; 2];
        regmap.bulk_read(0x00, &mut wia).unwrap();
        assert_eq!(wia, [0x48, 0x0c]);
    }

    #[test]
    fn test_i2c_read_is_one_combined_transfer() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip);
        let control = adapter.control();
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();

        let mut buf = [0u8; 9];
        regmap.bulk_read(0x10, &mut buf).unwrap();

        let log = control.transactions();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].len(), 2);
        assert!(!log[0][0].read);
        assert_eq!(log[0][0].data, vec![0x10]);
        assert!(log[0][1].read);
        assert_eq!(log[0][1].len, 9);
    }

    #[test]
    fn test_short_transfer_is_enxio() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip);
        let control = adapter.control();
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();

        control.short_next_transfer();
        let err = regmap.read(0x00).unwrap_err();
        assert_eq!(err.errno(), -libc::ENXIO);
    }

    #[test]
    fn test_spi_sets_read_flag_only_on_reads() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let dev = SimSpiDevice::new("/dev/spidev-sim", 1_000_000, chip.clone());
        let control = dev.control();
        let config = RegmapConfig::new(8, 8).with_read_flag_mask(0x80);
        let regmap = Regmap::init_spi(dev, &config).unwrap();

        regmap.write(0x31, 0x02).unwrap();
        assert_eq!(chip.lock().get(0x31), 0x02);
        assert_eq!(regmap.read(0x31).unwrap(), 0x02);

        let log = control.transactions();
        assert_eq!(log[0][0].data, vec![0x31, 0x02]);
        assert_eq!(log[1][0].data, vec![0xb1]);
    }

    #[test]
    fn test_max_register_bounds() {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip);
        let config = RegmapConfig::new(8, 8).with_max_register(0x32);
        let regmap = Regmap::init_i2c(adapter, 0x0c, &config).unwrap();

        let mut buf = [0u8; 2];
        assert!(regmap.bulk_read(0x31, &mut buf).is_ok());
        assert!(regmap.bulk_read(0x32, &mut buf).is_err());
    }

    #[test]
    fn test_update_bits_skips_noop_write() {
        let (regmap, chip) = i2c_regmap();
        chip.lock().set(0x31, 0x1f);
        assert!(!regmap.update_bits(0x31, 0x0f, 0x0f).unwrap());
        assert!(regmap.update_bits(0x31, 0x1f, 0x01).unwrap());
        assert_eq!(chip.lock().get(0x31), 0x01);
    }
}
