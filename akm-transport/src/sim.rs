//! Simulated buses for running drivers without hardware
//!
//! A simulated adapter forwards every byte to a [`SimTarget`], which models
//! the chip's register file. Chip-specific behaviour (mode registers, data
//! ready flags) lives in the target; the adapters only implement bus
//! framing, address checks, fault injection and a transaction log.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::BusError;
use crate::i2c::{I2cAdapter, I2cBuf, I2cFunctionality, I2cMsg, SMBUS_BLOCK_MAX};
use crate::spi::{SpiBus, SpiMode};

/// Register-level model of a chip
pub trait SimTarget: Send {
    fn read_reg(&mut self, reg: u8) -> u8;
    fn write_reg(&mut self, reg: u8, val: u8);
}

/// Plain 256-byte register file with no side effects
#[derive(Debug, Clone)]
pub struct RegisterFile {
    regs: [u8; 256],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self { regs: [0; 256] }
    }

    pub fn get(&self, reg: u8) -> u8 {
        self.regs[reg as usize]
    }

    pub fn set(&mut self, reg: u8, val: u8) {
        self.regs[reg as usize] = val;
    }

    pub fn fill(&mut self, val: u8) {
        self.regs = [val; 256];
    }
}

impl SimTarget for RegisterFile {
    fn read_reg(&mut self, reg: u8) -> u8 {
        self.get(reg)
    }

    fn write_reg(&mut self, reg: u8, val: u8) {
        self.set(reg, val);
    }
}

/// One message as seen on the simulated wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMsg {
    pub addr: u16,
    pub read: bool,
    pub len: usize,
    /// Bytes sent by the master (empty for reads)
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct SimState {
    transactions: Vec<Vec<LoggedMsg>>,
    /// Transfers to let through, then the error to fail with
    fail_next: Option<(usize, i32)>,
    short_next: bool,
}

/// Test-side handle for inspecting and disturbing a simulated bus
///
/// Stays valid after the adapter itself has been moved into a driver.
#[derive(Debug, Clone, Default)]
pub struct SimControl {
    state: Arc<Mutex<SimState>>,
}

impl SimControl {
    /// Make the next transfer fail with the given OS error code
    pub fn fail_next_transfer(&self, errno: i32) {
        self.fail_transfer_after(0, errno);
    }

    /// Let `ok` transfers through, then fail the one after with `errno`
    pub fn fail_transfer_after(&self, ok: usize, errno: i32) {
        self.state.lock().fail_next = Some((ok, errno));
    }

    /// Make the next transfer report one message fewer than issued
    pub fn short_next_transfer(&self) {
        self.state.lock().short_next = true;
    }

    /// All transactions seen so far, oldest first
    pub fn transactions(&self) -> Vec<Vec<LoggedMsg>> {
        self.state.lock().transactions.clone()
    }

    pub fn clear(&self) {
        self.state.lock().transactions.clear();
    }

    fn take_fault(&self, op: &'static str) -> Result<(), BusError> {
        let mut state = self.state.lock();
        match state.fail_next.take() {
            Some((0, errno)) => Err(BusError::transfer(op, errno)),
            Some((ok, errno)) => {
                state.fail_next = Some((ok - 1, errno));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn take_short(&self) -> bool {
        std::mem::take(&mut self.state.lock().short_next)
    }

    fn record(&self, msgs: Vec<LoggedMsg>) {
        self.state.lock().transactions.push(msgs);
    }
}

/// Simulated I2C adapter with a single slave
pub struct SimI2cAdapter<T: SimTarget + ?Sized> {
    path: String,
    addr: u16,
    target: Arc<Mutex<T>>,
    functionality: I2cFunctionality,
    control: SimControl,
    pointer: u8,
}

impl<T: SimTarget + ?Sized> SimI2cAdapter<T> {
    pub fn new(path: impl Into<String>, addr: u16, target: Arc<Mutex<T>>) -> Self {
        Self {
            path: path.into(),
            addr,
            target,
            functionality: I2cFunctionality::I2C
                .union(I2cFunctionality::SMBUS_BYTE_DATA)
                .union(I2cFunctionality::SMBUS_I2C_BLOCK),
            control: SimControl::default(),
            pointer: 0,
        }
    }

    /// Override the advertised adapter capabilities
    pub fn with_functionality(mut self, functionality: I2cFunctionality) -> Self {
        self.functionality = functionality;
        self
    }

    pub fn control(&self) -> SimControl {
        self.control.clone()
    }

    /// Capability, fault and address checks shared by the SMBus commands
    fn smbus_begin(
        &self,
        op: &'static str,
        needed: I2cFunctionality,
        addr: u16,
    ) -> Result<(), BusError> {
        if !self.functionality.contains(needed) {
            return Err(BusError::Unsupported(format!("{}: {}", self.path, op)));
        }
        self.control.take_fault(op)?;
        if addr != self.addr {
            return Err(BusError::transfer(op, libc::ENXIO));
        }
        Ok(())
    }

    /// Register read as it appears on the wire: command byte, then data
    fn smbus_read(&mut self, addr: u16, command: u8, buf: &mut [u8]) {
        let mut target = self.target.lock();
        self.pointer = command;
        for byte in buf.iter_mut() {
            *byte = target.read_reg(self.pointer);
            self.pointer = self.pointer.wrapping_add(1);
        }
        drop(target);
        self.control.record(vec![
            LoggedMsg {
                addr,
                read: false,
                len: 1,
                data: vec![command],
            },
            LoggedMsg {
                addr,
                read: true,
                len: buf.len(),
                data: Vec::new(),
            },
        ]);
    }

    fn smbus_write(&mut self, addr: u16, command: u8, data: &[u8]) {
        let mut target = self.target.lock();
        self.pointer = command;
        for &val in data {
            target.write_reg(self.pointer, val);
            self.pointer = self.pointer.wrapping_add(1);
        }
        drop(target);
        let mut wire = Vec::with_capacity(data.len() + 1);
        wire.push(command);
        wire.extend_from_slice(data);
        self.control.record(vec![LoggedMsg {
            addr,
            read: false,
            len: wire.len(),
            data: wire,
        }]);
    }
}

impl<T: SimTarget + ?Sized> I2cAdapter for SimI2cAdapter<T> {
    fn functionality(&self) -> I2cFunctionality {
        self.functionality
    }

    fn transfer(&mut self, msgs: &mut [I2cMsg<'_>]) -> Result<usize, BusError> {
        if !self.functionality.contains(I2cFunctionality::I2C) {
            return Err(BusError::Unsupported(format!("{}: plain I2C transfers", self.path)));
        }
        self.control.take_fault("i2c_transfer")?;

        if msgs.iter().any(|m| m.addr != self.addr) {
            // No ACK from an absent slave
            return Err(BusError::transfer("i2c_transfer", libc::ENXIO));
        }

        let mut logged = Vec::with_capacity(msgs.len());
        let mut target = self.target.lock();
        for msg in msgs.iter_mut() {
            match &mut msg.buf {
                I2cBuf::Write(data) => {
                    if let Some((&reg, values)) = data.split_first() {
                        self.pointer = reg;
                        for &val in values {
                            target.write_reg(self.pointer, val);
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                    logged.push(LoggedMsg {
                        addr: msg.addr,
                        read: false,
                        len: data.len(),
                        data: data.to_vec(),
                    });
                }
                I2cBuf::Read(data) => {
                    for byte in data.iter_mut() {
                        *byte = target.read_reg(self.pointer);
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                    logged.push(LoggedMsg {
                        addr: msg.addr,
                        read: true,
                        len: data.len(),
                        data: Vec::new(),
                    });
                }
            }
        }
        drop(target);

        trace!("sim i2c {}: {:?}", self.path, logged);
        self.control.record(logged);

        if self.control.take_short() {
            return Ok(msgs.len().saturating_sub(1));
        }
        Ok(msgs.len())
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn smbus_read_byte_data(&mut self, addr: u16, command: u8) -> Result<u8, BusError> {
        self.smbus_begin(
            "i2c_smbus_read_byte_data",
            I2cFunctionality::SMBUS_BYTE_DATA,
            addr,
        )?;
        let mut val = [0u8; 1];
        self.smbus_read(addr, command, &mut val);
        Ok(val[0])
    }

    fn smbus_write_byte_data(
        &mut self,
        addr: u16,
        command: u8,
        value: u8,
    ) -> Result<(), BusError> {
        self.smbus_begin(
            "i2c_smbus_write_byte_data",
            I2cFunctionality::SMBUS_BYTE_DATA,
            addr,
        )?;
        self.smbus_write(addr, command, &[value]);
        Ok(())
    }

    fn smbus_read_i2c_block_data(
        &mut self,
        addr: u16,
        command: u8,
        buf: &mut [u8],
    ) -> Result<(), BusError> {
        self.smbus_begin(
            "i2c_smbus_read_i2c_block_data",
            I2cFunctionality::SMBUS_I2C_BLOCK,
            addr,
        )?;
        if buf.len() > SMBUS_BLOCK_MAX {
            return Err(BusError::InvalidArgument(format!("SMBus block of {} bytes", buf.len())));
        }
        self.smbus_read(addr, command, buf);
        Ok(())
    }

    fn smbus_write_i2c_block_data(
        &mut self,
        addr: u16,
        command: u8,
        data: &[u8],
    ) -> Result<(), BusError> {
        self.smbus_begin(
            "i2c_smbus_write_i2c_block_data",
            I2cFunctionality::SMBUS_I2C_BLOCK,
            addr,
        )?;
        if data.len() > SMBUS_BLOCK_MAX {
            return Err(BusError::InvalidArgument(format!("SMBus block of {} bytes", data.len())));
        }
        self.smbus_write(addr, command, data);
        Ok(())
    }
}

/// Bit 7 of the first byte selects a read on AKM-style SPI framing
const SPI_READ_FLAG: u8 = 0x80;

/// Simulated SPI device
pub struct SimSpiDevice<T: SimTarget + ?Sized> {
    path: String,
    max_speed_hz: u32,
    mode: SpiMode,
    target: Arc<Mutex<T>>,
    control: SimControl,
}

impl<T: SimTarget + ?Sized> SimSpiDevice<T> {
    pub fn new(path: impl Into<String>, max_speed_hz: u32, target: Arc<Mutex<T>>) -> Self {
        Self {
            path: path.into(),
            max_speed_hz,
            mode: SpiMode::Mode0,
            target,
            control: SimControl::default(),
        }
    }

    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn control(&self) -> SimControl {
        self.control.clone()
    }

    fn write_regs(&self, tx: &[u8]) {
        if let Some((&first, values)) = tx.split_first() {
            let mut reg = first & !SPI_READ_FLAG;
            let mut target = self.target.lock();
            for &val in values {
                target.write_reg(reg, val);
                reg = reg.wrapping_add(1);
            }
        }
    }
}

impl<T: SimTarget + ?Sized> SpiBus for SimSpiDevice<T> {
    fn max_speed_hz(&self) -> u32 {
        self.max_speed_hz
    }

    fn mode(&self) -> SpiMode {
        self.mode
    }

    fn write(&mut self, tx: &[u8]) -> Result<(), BusError> {
        self.control.take_fault("spi_write")?;
        self.write_regs(tx);
        self.control.record(vec![LoggedMsg {
            addr: 0,
            read: false,
            len: tx.len(),
            data: tx.to_vec(),
        }]);
        Ok(())
    }

    fn write_then_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusError> {
        self.control.take_fault("spi_write_then_read")?;
        match tx.first() {
            Some(&first) if first & SPI_READ_FLAG != 0 => {
                let mut reg = first & !SPI_READ_FLAG;
                let mut target = self.target.lock();
                for byte in rx.iter_mut() {
                    *byte = target.read_reg(reg);
                    reg = reg.wrapping_add(1);
                }
            }
            _ => {
                // Without the read flag the chip treats the frame as a write
                self.write_regs(tx);
                rx.fill(0);
            }
        }
        self.control.record(vec![
            LoggedMsg {
                addr: 0,
                read: false,
                len: tx.len(),
                data: tx.to_vec(),
            },
            LoggedMsg {
                addr: 0,
                read: true,
                len: rx.len(),
                data: Vec::new(),
            },
        ]);
        Ok(())
    }

    fn path(&self) -> &str {
        &self.path
    }
}
