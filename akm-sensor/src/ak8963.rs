//! AK8963 core (raw bus operations)

use akm_transport::{BusOps, DeviceInfo};
use tracing::{debug, info, warn};

use crate::error::SensorError;
use crate::registers::{ak8963 as reg, AKM_COMPANY_ID};
use crate::sensor_core::{wait_ready, Magnetometer, MeasurementMode, RawSample, SensorCore};

pub const AK8963_NAME: &str = "AK8963";

fn mode_from_bits(bits: u8) -> MeasurementMode {
    match bits & reg::MODE_MASK {
        reg::MODE_POWER_DOWN => MeasurementMode::PowerDown,
        reg::MODE_SINGLE => MeasurementMode::Single,
        reg::MODE_SELF_TEST => MeasurementMode::SelfTest,
        _ => MeasurementMode::Continuous,
    }
}

fn mode_bits(mode: MeasurementMode) -> u8 {
    match mode {
        MeasurementMode::PowerDown => reg::MODE_POWER_DOWN,
        MeasurementMode::Single => reg::MODE_SINGLE,
        MeasurementMode::Continuous => reg::MODE_CONT_1,
        MeasurementMode::SelfTest => reg::MODE_SELF_TEST,
    }
}

/// A probed AK8963
pub struct Ak8963Device {
    ops: Box<dyn BusOps>,
    dev: DeviceInfo,
    irq: Option<u32>,
    info: u8,
    /// Full CNTL1 value saved across suspend
    saved_cntl1: Option<u8>,
}

impl Ak8963Device {
    /// Contents of the INFO register
    pub fn info(&self) -> u8 {
        self.info
    }

    fn read_regs(&mut self, addr: u8, out: &mut [u8]) -> Result<(), SensorError> {
        let len = out.len();
        out[0] = addr;
        self.ops.rxdata(out, len)?;
        Ok(())
    }

    fn read_reg(&mut self, addr: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.read_regs(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, addr: u8, val: u8) -> Result<(), SensorError> {
        self.ops.txdata(&[addr, val])?;
        Ok(())
    }

    fn ensure_awake(&self) -> Result<(), SensorError> {
        if self.saved_cntl1.is_some() {
            return Err(SensorError::Suspended);
        }
        Ok(())
    }
}

impl Magnetometer for Ak8963Device {
    fn chip(&self) -> &'static str {
        AK8963_NAME
    }

    fn device(&self) -> &DeviceInfo {
        &self.dev
    }

    fn irq(&self) -> Option<u32> {
        self.irq
    }

    fn is_suspended(&self) -> bool {
        self.saved_cntl1.is_some()
    }

    fn mode(&mut self) -> Result<MeasurementMode, SensorError> {
        Ok(mode_from_bits(self.read_reg(reg::CNTL1)?))
    }

    fn set_mode(&mut self, mode: MeasurementMode) -> Result<(), SensorError> {
        self.ensure_awake()?;
        let current = self.read_reg(reg::CNTL1)? & reg::MODE_MASK;
        let bits = mode_bits(mode);
        if current != reg::MODE_POWER_DOWN && bits != reg::MODE_POWER_DOWN {
            self.write_reg(reg::CNTL1, reg::MODE_POWER_DOWN)?;
        }
        self.write_reg(reg::CNTL1, reg::CNTL1_BIT | bits)
    }

    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        self.ensure_awake()?;

        if mode_from_bits(self.read_reg(reg::CNTL1)?) == MeasurementMode::PowerDown {
            self.write_reg(reg::CNTL1, reg::CNTL1_BIT | reg::MODE_SINGLE)?;
        }

        wait_ready(|| Ok(self.read_reg(reg::ST1)? & reg::ST1_DRDY != 0))?;

        let mut block = [0u8; reg::BLOCK_LEN];
        self.read_regs(reg::ST1, &mut block)?;
        let axes_start = (reg::HXL - reg::ST1) as usize;
        RawSample::parse(
            &block[axes_start..axes_start + 6],
            block[reg::BLOCK_LEN - 1],
            reg::ST2_HOFL,
        )
    }
}

/// Sensor core for the AK8963
#[derive(Debug, Default, Clone, Copy)]
pub struct Ak8963Core;

impl Ak8963Core {
    pub fn new() -> Self {
        Self
    }
}

impl SensorCore<Box<dyn BusOps>> for Ak8963Core {
    type Instance = Ak8963Device;

    fn probe(
        &self,
        dev: &DeviceInfo,
        ops: Box<dyn BusOps>,
        irq: Option<u32>,
        name: &str,
    ) -> Result<Self::Instance, SensorError> {
        debug!(device = %dev.location, "probing {} (irq {:?})", name, irq);

        let mut inst = Ak8963Device {
            ops,
            dev: dev.clone(),
            irq,
            info: 0,
            saved_cntl1: None,
        };

        let mut wia = [0u8; 2];
        inst.read_regs(reg::WIA, &mut wia)?;
        if wia[0] != AKM_COMPANY_ID {
            return Err(SensorError::WrongCompany(wia[0]));
        }
        inst.info = wia[1];

        inst.write_reg(reg::CNTL2, reg::CNTL2_SRST)?;
        inst.write_reg(reg::CNTL1, reg::MODE_POWER_DOWN)?;

        info!(device = %dev.location, "{} detected (info 0x{:02x})", AK8963_NAME, inst.info);
        Ok(inst)
    }

    fn remove(&self, mut instance: Self::Instance) -> Result<(), SensorError> {
        debug!(device = %instance.dev.location, "removing {}", AK8963_NAME);
        instance.write_reg(reg::CNTL1, reg::MODE_POWER_DOWN)
    }

    fn suspend(&self, instance: &mut Self::Instance) -> Result<(), SensorError> {
        if instance.saved_cntl1.is_some() {
            warn!(device = %instance.dev.location, "already suspended");
            return Ok(());
        }
        let cntl1 = instance.read_reg(reg::CNTL1)?;
        instance.write_reg(reg::CNTL1, reg::MODE_POWER_DOWN)?;
        instance.saved_cntl1 = Some(cntl1);
        debug!(device = %instance.dev.location, "suspended, saved CNTL1 0x{:02x}", cntl1);
        Ok(())
    }

    fn resume(&self, instance: &mut Self::Instance) -> Result<(), SensorError> {
        let Some(cntl1) = instance.saved_cntl1 else {
            return Ok(());
        };
        let mode = cntl1 & reg::MODE_MASK;
        if mode != reg::MODE_POWER_DOWN && mode != reg::MODE_SINGLE {
            instance.write_reg(reg::CNTL1, cntl1)?;
        }
        instance.saved_cntl1 = None;
        debug!(device = %instance.dev.location, "resumed, CNTL1 0x{:02x}", cntl1);
        Ok(())
    }
}
