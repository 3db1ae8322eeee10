//! I2C adapter backed by the Linux i2c-dev interface (`/dev/i2c-N`)

use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use i2cdev::core::{I2CDevice, I2CMessage, I2CTransfer};
use i2cdev::linux::{LinuxI2CBus, LinuxI2CDevice, LinuxI2CError, LinuxI2CMessage};
use tracing::debug;

use crate::error::BusError;
use crate::i2c::{I2cAdapter, I2cBuf, I2cFunctionality, I2cMsg, SMBUS_BLOCK_MAX};

/// `I2C_FUNCS` ioctl request number from `<linux/i2c-dev.h>`
const I2C_FUNCS: libc::c_ulong = 0x0705;

/// Query adapter functionality bits
fn query_functionality(path: &Path) -> io::Result<I2cFunctionality> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut funcs: libc::c_ulong = 0;
    // SAFETY: `file` is an open i2c-dev node for the duration of the call and
    // I2C_FUNCS writes exactly one `unsigned long` through the pointer.
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), I2C_FUNCS as _, &mut funcs) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(I2cFunctionality::from_bits(funcs as u64))
}

fn smbus_error(op: &'static str) -> impl Fn(LinuxI2CError) -> BusError {
    move |e| BusError::Transfer {
        op,
        source: io::Error::from(e),
    }
}

fn check_block_len(len: usize) -> Result<(), BusError> {
    if len > SMBUS_BLOCK_MAX {
        return Err(BusError::InvalidArgument(format!("SMBus block of {len} bytes")));
    }
    Ok(())
}

/// I2C adapter on a Linux i2c-dev character device
pub struct LinuxI2cAdapter {
    bus: LinuxI2CBus,
    path: String,
    functionality: I2cFunctionality,
    /// Slave-addressed handle for SMBus commands, opened on first use
    smbus: Option<(u16, LinuxI2CDevice)>,
}

impl LinuxI2cAdapter {
    /// Open an adapter, e.g. `/dev/i2c-1`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BusError> {
        let path = path.as_ref();
        let functionality = query_functionality(path)?;
        let bus = LinuxI2CBus::new(path).map_err(io::Error::from)?;
        debug!(
            "Opened I2C adapter {} functionality={:?}",
            path.display(),
            functionality
        );
        Ok(Self {
            bus,
            path: path.display().to_string(),
            functionality,
            smbus: None,
        })
    }

    /// SMBus handle bound to `addr` via `I2C_SLAVE`
    fn smbus_device(&mut self, addr: u16) -> Result<&mut LinuxI2CDevice, BusError> {
        let bound = matches!(&self.smbus, Some((a, _)) if *a == addr);
        if !bound {
            let dev = LinuxI2CDevice::new(&self.path, addr)
                .map_err(smbus_error("i2c_smbus_open"))?;
            debug!("{}: SMBus handle for 0x{:02x}", self.path, addr);
            self.smbus = Some((addr, dev));
        }
        self.smbus
            .as_mut()
            .map(|(_, dev)| dev)
            .ok_or_else(|| BusError::NotFound(format!("{}: SMBus handle", self.path)))
    }
}

impl I2cAdapter for LinuxI2cAdapter {
    fn functionality(&self) -> I2cFunctionality {
        self.functionality
    }

    fn transfer(&mut self, msgs: &mut [I2cMsg<'_>]) -> Result<usize, BusError> {
        let mut linux_msgs: Vec<LinuxI2CMessage<'_>> = msgs
            .iter_mut()
            .map(|msg| {
                let addr = msg.addr;
                match &mut msg.buf {
                    I2cBuf::Write(data) => LinuxI2CMessage::write(*data).with_address(addr),
                    I2cBuf::Read(data) => LinuxI2CMessage::read(&mut **data).with_address(addr),
                }
            })
            .collect();

        let done = self.bus.transfer(&mut linux_msgs).map_err(|e| BusError::Transfer {
            op: "i2c_transfer",
            source: io::Error::from(e),
        })?;
        Ok(done as usize)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn smbus_read_byte_data(&mut self, addr: u16, command: u8) -> Result<u8, BusError> {
        self.smbus_device(addr)?
            .smbus_read_byte_data(command)
            .map_err(smbus_error("i2c_smbus_read_byte_data"))
    }

    fn smbus_write_byte_data(
        &mut self,
        addr: u16,
        command: u8,
        value: u8,
    ) -> Result<(), BusError> {
        self.smbus_device(addr)?
            .smbus_write_byte_data(command, value)
            .map_err(smbus_error("i2c_smbus_write_byte_data"))
    }

    fn smbus_read_i2c_block_data(
        &mut self,
        addr: u16,
        command: u8,
        buf: &mut [u8],
    ) -> Result<(), BusError> {
        check_block_len(buf.len())?;
        let data = self
            .smbus_device(addr)?
            .smbus_read_i2c_block_data(command, buf.len() as u8)
            .map_err(smbus_error("i2c_smbus_read_i2c_block_data"))?;
        if data.len() != buf.len() {
            return Err(BusError::ShortTransfer {
                op: "i2c_smbus_read_i2c_block_data",
                expected: buf.len(),
                actual: data.len(),
            });
        }
        buf.copy_from_slice(&data);
        Ok(())
    }

    fn smbus_write_i2c_block_data(
        &mut self,
        addr: u16,
        command: u8,
        data: &[u8],
    ) -> Result<(), BusError> {
        check_block_len(data.len())?;
        self.smbus_device(addr)?
            .smbus_write_i2c_block_data(command, data)
            .map_err(smbus_error("i2c_smbus_write_i2c_block_data"))
    }
}
