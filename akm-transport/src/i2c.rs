//! I2C adapter abstraction
//!
//! Mirrors the shape of the Linux `i2c_transfer()` interface: a transaction
//! is a slice of messages executed back-to-back with repeated starts, and the
//! adapter reports how many of them completed.

use std::fmt;

use crate::error::BusError;

/// Largest SMBus block payload (`I2C_SMBUS_BLOCK_MAX`)
pub const SMBUS_BLOCK_MAX: usize = 32;

/// Adapter capability bits, values match the kernel's `I2C_FUNC_*`
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct I2cFunctionality(u64);

impl I2cFunctionality {
    /// Plain I2C-level commands (combined transfers)
    pub const I2C: Self = Self(0x0000_0001);
    /// 10-bit slave addressing
    pub const TEN_BIT_ADDR: Self = Self(0x0000_0002);
    /// SMBus read/write byte data
    pub const SMBUS_BYTE_DATA: Self = Self(0x0018_0000);
    /// SMBus I2C block read/write
    pub const SMBUS_I2C_BLOCK: Self = Self(0x0c00_0000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True if every bit of `other` is set
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Debug for I2cFunctionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I2cFunctionality({:#010x})", self.0)
    }
}

/// Message buffer, direction is encoded by the variant
#[derive(Debug)]
pub enum I2cBuf<'a> {
    Write(&'a [u8]),
    Read(&'a mut [u8]),
}

/// One segment of an I2C transaction
#[derive(Debug)]
pub struct I2cMsg<'a> {
    /// 7-bit slave address
    pub addr: u16,
    pub buf: I2cBuf<'a>,
}

impl<'a> I2cMsg<'a> {
    pub fn write(addr: u16, data: &'a [u8]) -> Self {
        Self {
            addr,
            buf: I2cBuf::Write(data),
        }
    }

    pub fn read(addr: u16, data: &'a mut [u8]) -> Self {
        Self {
            addr,
            buf: I2cBuf::Read(data),
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self.buf, I2cBuf::Read(_))
    }

    pub fn len(&self) -> usize {
        match &self.buf {
            I2cBuf::Write(data) => data.len(),
            I2cBuf::Read(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An I2C bus master
///
/// Implementations execute all messages as a single combined transaction.
pub trait I2cAdapter: Send {
    /// Capabilities of this adapter
    fn functionality(&self) -> I2cFunctionality;

    /// Run a combined transaction
    ///
    /// # Returns
    /// Number of messages that completed
    fn transfer(&mut self, msgs: &mut [I2cMsg<'_>]) -> Result<usize, BusError>;

    /// Human-readable adapter location (e.g. `/dev/i2c-1`)
    fn path(&self) -> &str;

    /// SMBus read byte data: one register at `command`
    fn smbus_read_byte_data(&mut self, _addr: u16, _command: u8) -> Result<u8, BusError> {
        Err(BusError::Unsupported(format!("{}: SMBus read byte data", self.path())))
    }

    /// SMBus write byte data
    fn smbus_write_byte_data(
        &mut self,
        _addr: u16,
        _command: u8,
        _value: u8,
    ) -> Result<(), BusError> {
        Err(BusError::Unsupported(format!("{}: SMBus write byte data", self.path())))
    }

    /// SMBus I2C block read of `buf.len()` bytes (at most [`SMBUS_BLOCK_MAX`])
    fn smbus_read_i2c_block_data(
        &mut self,
        _addr: u16,
        _command: u8,
        _buf: &mut [u8],
    ) -> Result<(), BusError> {
        Err(BusError::Unsupported(format!("{}: SMBus I2C block read", self.path())))
    }

    /// SMBus I2C block write (at most [`SMBUS_BLOCK_MAX`] bytes)
    fn smbus_write_i2c_block_data(
        &mut self,
        _addr: u16,
        _command: u8,
        _data: &[u8],
    ) -> Result<(), BusError> {
        Err(BusError::Unsupported(format!("{}: SMBus I2C block write", self.path())))
    }
}

impl I2cAdapter for Box<dyn I2cAdapter> {
    fn functionality(&self) -> I2cFunctionality {
        (**self).functionality()
    }

    fn transfer(&mut self, msgs: &mut [I2cMsg<'_>]) -> Result<usize, BusError> {
        (**self).transfer(msgs)
    }

    fn path(&self) -> &str {
        (**self).path()
    }

    fn smbus_read_byte_data(&mut self, addr: u16, command: u8) -> Result<u8, BusError> {
        (**self).smbus_read_byte_data(addr, command)
    }

    fn smbus_write_byte_data(
        &mut self,
        addr: u16,
        command: u8,
        value: u8,
    ) -> Result<(), BusError> {
        (**self).smbus_write_byte_data(addr, command, value)
    }

    fn smbus_read_i2c_block_data(
        &mut self,
        addr: u16,
        command: u8,
        buf: &mut [u8],
    ) -> Result<(), BusError> {
        (**self).smbus_read_i2c_block_data(addr, command, buf)
    }

    fn smbus_write_i2c_block_data(
        &mut self,
        addr: u16,
        command: u8,
        data: &[u8],
    ) -> Result<(), BusError> {
        (**self).smbus_write_i2c_block_data(addr, command, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functionality_contains() {
        let f = I2cFunctionality::I2C.union(I2cFunctionality::SMBUS_BYTE_DATA);
        assert!(f.contains(I2cFunctionality::I2C));
        assert!(f.contains(I2cFunctionality::SMBUS_BYTE_DATA));
        assert!(!f.contains(I2cFunctionality::TEN_BIT_ADDR));
        assert!(!I2cFunctionality::SMBUS_BYTE_DATA.contains(I2cFunctionality::I2C));
    }

    #[test]
    fn test_msg_direction_and_len() {
        let reg = [0x10];
        let mut data = [0u8; 9];
        let w = I2cMsg::write(0x0c, &reg);
        let r = I2cMsg::read(0x0c, &mut data);
        assert!(!w.is_read());
        assert!(r.is_read());
        assert_eq!(w.len(), 1);
        assert_eq!(r.len(), 9);
    }
}
