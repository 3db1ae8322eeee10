//! Raw receive/transmit operations for cores that format their own frames
//!
//! The AK8963 core does not use a register map; it hands the transport a
//! buffer whose first byte is the register address and expects the bus
//! glue to run the matching transaction.

use tracing::{error, trace};

use crate::error::BusError;
use crate::i2c::{I2cAdapter, I2cMsg};
use crate::types::BusType;

/// Byte-level bus operations
pub trait BusOps: Send {
    fn bus_type(&self) -> BusType;

    /// Read `length` bytes from the register in `buf[0]`
    ///
    /// `buf[0]` is sent as the register address, then the first `length`
    /// bytes of `buf` are overwritten with the data read back.
    fn rxdata(&mut self, buf: &mut [u8], length: usize) -> Result<(), BusError>;

    /// Write `buf` as-is (register address followed by values)
    fn txdata(&mut self, buf: &[u8]) -> Result<(), BusError>;

    /// Bus location for log messages
    fn location(&self) -> String;
}

impl BusOps for Box<dyn BusOps> {
    fn bus_type(&self) -> BusType {
        (**self).bus_type()
    }

    fn rxdata(&mut self, buf: &mut [u8], length: usize) -> Result<(), BusError> {
        (**self).rxdata(buf, length)
    }

    fn txdata(&mut self, buf: &[u8]) -> Result<(), BusError> {
        (**self).txdata(buf)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// [`BusOps`] over an I2C adapter
pub struct I2cBusOps<A> {
    adapter: A,
    addr: u16,
}

impl<A: I2cAdapter> I2cBusOps<A> {
    pub fn new(adapter: A, addr: u16) -> Self {
        Self { adapter, addr }
    }

    pub fn addr(&self) -> u16 {
        self.addr
    }

    fn run(&mut self, op: &'static str, msgs: &mut [I2cMsg<'_>]) -> Result<(), BusError> {
        let expected = msgs.len();
        let done = match self.adapter.transfer(msgs) {
            Ok(done) => done,
            Err(e) => {
                error!(device = %self.location(), "{op}: transfer failed.");
                return Err(e);
            }
        };
        if done != expected {
            error!(device = %self.location(), "{op}: transfer failed(size error).");
            return Err(BusError::ShortTransfer {
                op,
                expected,
                actual: done,
            });
        }
        Ok(())
    }
}

impl<A: I2cAdapter> BusOps for I2cBusOps<A> {
    fn bus_type(&self) -> BusType {
        BusType::I2c
    }

    fn rxdata(&mut self, buf: &mut [u8], length: usize) -> Result<(), BusError> {
        if length == 0 || buf.len() < length {
            return Err(BusError::InvalidArgument(format!(
                "rxdata: length {length} with {}-byte buffer",
                buf.len()
            )));
        }

        let reg = [buf[0]];
        let addr = self.addr;
        let mut msgs = [I2cMsg::write(addr, &reg), I2cMsg::read(addr, &mut buf[..length])];
        self.run("rxdata", &mut msgs)?;

        trace!(
            "RxData: len={:02x}, addr={:02x}  data={:02x}",
            length,
            reg[0],
            buf.get(1).copied().unwrap_or(buf[0])
        );
        Ok(())
    }

    fn txdata(&mut self, buf: &[u8]) -> Result<(), BusError> {
        if buf.is_empty() {
            return Err(BusError::InvalidArgument("txdata: empty buffer".into()));
        }

        let mut msgs = [I2cMsg::write(self.addr, buf)];
        self.run("txdata", &mut msgs)?;

        trace!(
            "TxData: len={:02x}, addr={:02x} data={:02x}",
            buf.len(),
            buf[0],
            buf.get(1).copied().unwrap_or(0)
        );
        Ok(())
    }

    fn location(&self) -> String {
        format!("{}@0x{:02x}", self.adapter.path(), self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RegisterFile, SimI2cAdapter};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn ops() -> (I2cBusOps<SimI2cAdapter<RegisterFile>>, Arc<Mutex<RegisterFile>>) {
        let chip = Arc::new(Mutex::new(RegisterFile::new()));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone());
        (I2cBusOps::new(adapter, 0x0c), chip)
    }

    #[test]
    fn test_rxdata_two_messages() {
        let (mut ops, chip) = ops();
        let control = ops.adapter.control();
        chip.lock().set(0x03, 0x12);
        chip.lock().set(0x04, 0x34);

        let mut buf = [0x03, 0, 0];
        ops.rxdata(&mut buf, 2).unwrap();
        assert_eq!(&buf[..2], &[0x12, 0x34]);
        // Bytes past `length` are untouched
        assert_eq!(buf[2], 0);

        let log = control.transactions();
        assert_eq!(log.len(), 1);
        let msgs = &log[0];
        assert_eq!(msgs.len(), 2);
        assert_eq!((msgs[0].read, msgs[0].len), (false, 1));
        assert_eq!(msgs[0].data, vec![0x03]);
        assert_eq!((msgs[1].read, msgs[1].len), (true, 2));
    }

    #[test]
    fn test_txdata_single_message() {
        let (mut ops, chip) = ops();
        let control = ops.adapter.control();
        ops.txdata(&[0x0a, 0x11]).unwrap();
        assert_eq!(chip.lock().get(0x0a), 0x11);
        assert_eq!(control.transactions()[0].len(), 1);
    }

    #[test]
    fn test_short_count_is_enxio() {
        let (mut ops, _chip) = ops();
        ops.adapter.control().short_next_transfer();
        let mut buf = [0x00, 0];
        let err = ops.rxdata(&mut buf, 1).unwrap_err();
        assert!(matches!(
            err,
            BusError::ShortTransfer {
                op: "rxdata",
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(err.errno(), -libc::ENXIO);
    }

    #[test]
    fn test_transfer_error_propagates_code() {
        let (mut ops, _chip) = ops();
        ops.adapter.control().fail_next_transfer(libc::EREMOTEIO);
        let err = ops.txdata(&[0x0a, 0x00]).unwrap_err();
        assert_eq!(err.errno(), -libc::EREMOTEIO);
    }

    #[test]
    fn test_rxdata_rejects_bad_length() {
        let (mut ops, _chip) = ops();
        let mut buf = [0x00; 2];
        assert!(ops.rxdata(&mut buf, 0).is_err());
        assert!(ops.rxdata(&mut buf, 3).is_err());
    }
}
