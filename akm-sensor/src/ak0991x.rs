//! AK0991X family core (register-map based)

use std::fmt;

use akm_transport::{DeviceInfo, Regmap};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SensorError;
use crate::registers::{ak0991x as reg, AKM_COMPANY_ID};
use crate::sensor_core::{wait_ready, Magnetometer, MeasurementMode, RawSample, SensorCore};

/// Parts of the AK0991X family, keyed by WIA2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Ak0991xVariant {
    Ak09911,
    Ak09912,
    Ak09913,
    /// AK09915 and AK09915D share a device ID
    Ak09915,
    Ak09916C,
    Ak09916D,
    Ak09917,
    Ak09918,
    Ak09919,
}

impl Ak0991xVariant {
    pub const ALL: &'static [Ak0991xVariant] = &[
        Ak0991xVariant::Ak09911,
        Ak0991xVariant::Ak09912,
        Ak0991xVariant::Ak09913,
        Ak0991xVariant::Ak09915,
        Ak0991xVariant::Ak09916C,
        Ak0991xVariant::Ak09916D,
        Ak0991xVariant::Ak09917,
        Ak0991xVariant::Ak09918,
        Ak0991xVariant::Ak09919,
    ];

    /// WIA2 value
    pub const fn device_id(&self) -> u8 {
        match self {
            Ak0991xVariant::Ak09911 => 0x05,
            Ak0991xVariant::Ak09912 => 0x04,
            Ak0991xVariant::Ak09913 => 0x08,
            Ak0991xVariant::Ak09915 => 0x10,
            Ak0991xVariant::Ak09916C => 0x09,
            Ak0991xVariant::Ak09916D => 0x0b,
            Ak0991xVariant::Ak09917 => 0x0d,
            Ak0991xVariant::Ak09918 => 0x0c,
            Ak0991xVariant::Ak09919 => 0x0e,
        }
    }

    pub fn from_device_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.device_id() == id)
    }

    /// Variant named by a device-tree compatible such as `asahi-kasei,ak09918`
    pub fn from_compatible(compatible: &str) -> Option<Self> {
        let part = compatible.rsplit(',').next()?;
        match part {
            "ak09911" => Some(Ak0991xVariant::Ak09911),
            "ak09912" => Some(Ak0991xVariant::Ak09912),
            "ak09913" => Some(Ak0991xVariant::Ak09913),
            "ak09915" | "ak09915d" => Some(Ak0991xVariant::Ak09915),
            "ak09916" => Some(Ak0991xVariant::Ak09916C),
            "ak09916d" => Some(Ak0991xVariant::Ak09916D),
            "ak09917" | "ak09917d" => Some(Ak0991xVariant::Ak09917),
            "ak09918" => Some(Ak0991xVariant::Ak09918),
            "ak09919" => Some(Ak0991xVariant::Ak09919),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Ak0991xVariant::Ak09911 => "AK09911",
            Ak0991xVariant::Ak09912 => "AK09912",
            Ak0991xVariant::Ak09913 => "AK09913",
            Ak0991xVariant::Ak09915 => "AK09915",
            Ak0991xVariant::Ak09916C => "AK09916C",
            Ak0991xVariant::Ak09916D => "AK09916D",
            Ak0991xVariant::Ak09917 => "AK09917",
            Ak0991xVariant::Ak09918 => "AK09918",
            Ak0991xVariant::Ak09919 => "AK09919",
        }
    }

    /// The AK09911 only has single-shot and self-test measurements
    pub const fn has_continuous_mode(&self) -> bool {
        !matches!(self, Ak0991xVariant::Ak09911)
    }
}

impl fmt::Display for Ak0991xVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

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

/// A probed AK0991X chip
pub struct Ak0991xDevice {
    regmap: Regmap,
    variant: Ak0991xVariant,
    dev: DeviceInfo,
    irq: Option<u32>,
    name: String,
    /// CNTL2 mode bits saved across suspend
    saved_mode: Option<u8>,
}

impl Ak0991xDevice {
    pub fn variant(&self) -> Ak0991xVariant {
        self.variant
    }

    /// Device-table name the driver matched on
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regmap(&self) -> &Regmap {
        &self.regmap
    }

    fn ensure_awake(&self) -> Result<(), SensorError> {
        if self.saved_mode.is_some() {
            return Err(SensorError::Suspended);
        }
        Ok(())
    }

    fn write_mode(&self, bits: u8) -> Result<(), SensorError> {
        // Mode changes must pass through power-down
        let current = self.regmap.read(reg::CNTL2)? & reg::MODE_MASK;
        if current != reg::MODE_POWER_DOWN && bits != reg::MODE_POWER_DOWN {
            self.regmap.write(reg::CNTL2, reg::MODE_POWER_DOWN)?;
        }
        self.regmap.write(reg::CNTL2, bits)?;
        Ok(())
    }
}

impl Magnetometer for Ak0991xDevice {
    fn chip(&self) -> &'static str {
        self.variant.name()
    }

    fn device(&self) -> &DeviceInfo {
        &self.dev
    }

    fn irq(&self) -> Option<u32> {
        self.irq
    }

    fn is_suspended(&self) -> bool {
        self.saved_mode.is_some()
    }

    fn mode(&mut self) -> Result<MeasurementMode, SensorError> {
        Ok(mode_from_bits(self.regmap.read(reg::CNTL2)?))
    }

    fn set_mode(&mut self, mode: MeasurementMode) -> Result<(), SensorError> {
        self.ensure_awake()?;
        if mode == MeasurementMode::Continuous && !self.variant.has_continuous_mode() {
            return Err(SensorError::InvalidArgument(format!(
                "{} has no continuous measurement mode",
                self.variant
            )));
        }
        self.write_mode(mode_bits(mode))
    }

    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        self.ensure_awake()?;

        let mode = mode_from_bits(self.regmap.read(reg::CNTL2)?);
        if mode == MeasurementMode::PowerDown {
            self.regmap.write(reg::CNTL2, reg::MODE_SINGLE)?;
        }

        let regmap = &self.regmap;
        wait_ready(|| Ok(regmap.read(reg::ST1)? & reg::ST1_DRDY != 0))?;

        // Reading through ST2 releases the data registers
        let mut block = [0u8; reg::BLOCK_LEN];
        regmap.bulk_read(reg::ST1, &mut block)?;
        let axes_start = (reg::HXL - reg::ST1) as usize;
        RawSample::parse(
            &block[axes_start..axes_start + 6],
            block[reg::BLOCK_LEN - 1],
            reg::ST2_HOFL,
        )
    }
}

/// Sensor core for the AK0991X family
#[derive(Debug, Default, Clone, Copy)]
pub struct Ak0991xCore;

impl Ak0991xCore {
    pub fn new() -> Self {
        Self
    }

    /// Read WIA1/WIA2 and resolve the part
    pub fn identify(regmap: &Regmap) -> Result<Ak0991xVariant, SensorError> {
        let mut wia = [0u8; 2];
        regmap.bulk_read(reg::WIA1, &mut wia)?;
        if wia[0] != AKM_COMPANY_ID {
            return Err(SensorError::WrongCompany(wia[0]));
        }
        Ak0991xVariant::from_device_id(wia[1]).ok_or(SensorError::UnknownChip(wia[1]))
    }
}

impl SensorCore<Regmap> for Ak0991xCore {
    type Instance = Ak0991xDevice;

    fn probe(
        &self,
        dev: &DeviceInfo,
        regmap: Regmap,
        irq: Option<u32>,
        name: &str,
    ) -> Result<Self::Instance, SensorError> {
        debug!(device = %dev.location, "probing {} (irq {:?})", name, irq);

        let variant = Self::identify(&regmap)?;

        regmap.write(reg::CNTL3, reg::CNTL3_SRST)?;
        regmap.write(reg::CNTL2, reg::MODE_POWER_DOWN)?;

        info!(device = %dev.location, "{} detected ({})", variant, dev.bus_type);

        Ok(Ak0991xDevice {
            regmap,
            variant,
            dev: dev.clone(),
            irq,
            name: name.to_string(),
            saved_mode: None,
        })
    }

    fn remove(&self, instance: Self::Instance) -> Result<(), SensorError> {
        debug!(device = %instance.dev.location, "removing {}", instance.variant);
        instance.regmap.write(reg::CNTL2, reg::MODE_POWER_DOWN)?;
        Ok(())
    }

    fn suspend(&self, instance: &mut Self::Instance) -> Result<(), SensorError> {
        if instance.saved_mode.is_some() {
            warn!(device = %instance.dev.location, "already suspended");
            return Ok(());
        }
        let mode = instance.regmap.read(reg::CNTL2)? & reg::MODE_MASK;
        instance.regmap.write(reg::CNTL2, reg::MODE_POWER_DOWN)?;
        instance.saved_mode = Some(mode);
        debug!(device = %instance.dev.location, "suspended, saved mode 0x{:02x}", mode);
        Ok(())
    }

    fn resume(&self, instance: &mut Self::Instance) -> Result<(), SensorError> {
        let Some(mode) = instance.saved_mode else {
            return Ok(());
        };
        // A single measurement ends in power-down on its own
        if mode != reg::MODE_POWER_DOWN && mode != reg::MODE_SINGLE {
            instance.regmap.write(reg::CNTL2, mode)?;
        }
        // Only cleared once the mode is back
        instance.saved_mode = None;
        debug!(device = %instance.dev.location, "resumed, mode 0x{:02x}", mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimAk0991x;
    use akm_transport::{RegmapConfig, SimI2cAdapter, SimSpiDevice};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn probe_i2c(variant: Ak0991xVariant) -> (Ak0991xDevice, Arc<Mutex<SimAk0991x>>) {
        let chip = Arc::new(Mutex::new(SimAk0991x::new(variant)));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone());
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();
        let dev = DeviceInfo::i2c("/dev/i2c-sim", 0x0c, "ak0991x");
        let inst = Ak0991xCore.probe(&dev, regmap, Some(42), "ak0991x").unwrap();
        (inst, chip)
    }

    #[test]
    fn test_variant_table_round_trip() {
        for v in Ak0991xVariant::ALL {
            assert_eq!(Ak0991xVariant::from_device_id(v.device_id()), Some(*v));
        }
        assert_eq!(Ak0991xVariant::from_device_id(0xff), None);
    }

    #[test]
    fn test_variant_from_compatible() {
        assert_eq!(
            Ak0991xVariant::from_compatible("asahi-kasei,ak09918"),
            Some(Ak0991xVariant::Ak09918)
        );
        assert_eq!(
            Ak0991xVariant::from_compatible("asahi-kasei,ak09915d"),
            Some(Ak0991xVariant::Ak09915)
        );
        assert_eq!(Ak0991xVariant::from_compatible("bosch,bmm150"), None);
    }

    #[test]
    fn test_probe_identifies_and_powers_down() {
        let (mut inst, chip) = probe_i2c(Ak0991xVariant::Ak09918);
        assert_eq!(inst.chip(), "AK09918");
        assert_eq!(inst.irq(), Some(42));
        assert_eq!(inst.name(), "ak0991x");
        assert_eq!(inst.mode().unwrap(), MeasurementMode::PowerDown);
        assert_eq!(chip.lock().resets(), 1);
    }

    #[test]
    fn test_probe_rejects_foreign_chip() {
        let chip = Arc::new(Mutex::new(SimAk0991x::new(Ak0991xVariant::Ak09918)));
        chip.lock().set_company_id(0x32);
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip);
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();
        let dev = DeviceInfo::i2c("/dev/i2c-sim", 0x0c, "ak0991x");
        let err = Ak0991xCore
            .probe(&dev, regmap, None, "ak0991x")
            .err()
            .unwrap();
        assert!(matches!(err, SensorError::WrongCompany(0x32)));
        assert_eq!(err.errno(), -libc::ENODEV);
    }

    #[test]
    fn test_single_measurement() {
        let (mut inst, chip) = probe_i2c(Ak0991xVariant::Ak09916C);
        chip.lock().set_field(120, -45, 3000);
        let sample = inst.read_raw().unwrap();
        assert_eq!((sample.x, sample.y, sample.z), (120, -45, 3000));
        assert!(!sample.overflow);
        // Single mode drops back to power-down
        assert_eq!(inst.mode().unwrap(), MeasurementMode::PowerDown);
    }

    #[test]
    fn test_suspend_resume_restores_continuous_mode() {
        let (mut inst, chip) = probe_i2c(Ak0991xVariant::Ak09918);
        inst.set_mode(MeasurementMode::Continuous).unwrap();

        Ak0991xCore.suspend(&mut inst).unwrap();
        assert!(inst.is_suspended());
        assert_eq!(chip.lock().mode(), reg::MODE_POWER_DOWN);
        assert!(matches!(inst.read_raw(), Err(SensorError::Suspended)));

        Ak0991xCore.resume(&mut inst).unwrap();
        assert!(!inst.is_suspended());
        assert_eq!(chip.lock().mode(), reg::MODE_CONT_1);
        assert!(inst.read_raw().is_ok());
    }

    #[test]
    fn test_failed_resume_keeps_saved_mode() {
        let chip = Arc::new(Mutex::new(SimAk0991x::new(Ak0991xVariant::Ak09918)));
        let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone());
        let control = adapter.control();
        let regmap = Regmap::init_i2c(adapter, 0x0c, &RegmapConfig::new(8, 8)).unwrap();
        let dev = DeviceInfo::i2c("/dev/i2c-sim", 0x0c, "ak0991x");
        let mut inst = Ak0991xCore.probe(&dev, regmap, None, "ak0991x").unwrap();
        inst.set_mode(MeasurementMode::Continuous).unwrap();
        Ak0991xCore.suspend(&mut inst).unwrap();

        control.fail_next_transfer(libc::EIO);
        let err = Ak0991xCore.resume(&mut inst).err().unwrap();
        assert_eq!(err.errno(), -libc::EIO);
        assert!(inst.is_suspended());
        assert_eq!(chip.lock().mode(), reg::MODE_POWER_DOWN);

        Ak0991xCore.resume(&mut inst).unwrap();
        assert!(!inst.is_suspended());
        assert_eq!(chip.lock().mode(), reg::MODE_CONT_1);
    }

    #[test]
    fn test_ak09911_rejects_continuous_mode() {
        let (mut inst, chip) = probe_i2c(Ak0991xVariant::Ak09911);
        let writes = chip.lock().mode_writes();
        let err = inst.set_mode(MeasurementMode::Continuous).err().unwrap();
        assert!(matches!(err, SensorError::InvalidArgument(_)));
        assert_eq!(err.errno(), -libc::EINVAL);
        assert_eq!(chip.lock().mode_writes(), writes);
        assert_eq!(chip.lock().mode(), reg::MODE_POWER_DOWN);

        inst.set_mode(MeasurementMode::Single).unwrap();
        assert!(Ak0991xVariant::Ak09918.has_continuous_mode());
    }

    #[test]
    fn test_resume_without_suspend_is_noop() {
        let (mut inst, chip) = probe_i2c(Ak0991xVariant::Ak09918);
        let writes = chip.lock().mode_writes();
        Ak0991xCore.resume(&mut inst).unwrap();
        assert_eq!(chip.lock().mode_writes(), writes);
    }

    #[test]
    fn test_spi_probe_and_read() {
        let chip = Arc::new(Mutex::new(SimAk0991x::new(Ak0991xVariant::Ak09915)));
        chip.lock().set_field(-1, 2, -3);
        let spi = SimSpiDevice::new("/dev/spidev-sim", 2_500_000, chip);
        let config = RegmapConfig::new(8, 8).with_read_flag_mask(0x80);
        let regmap = Regmap::init_spi(spi, &config).unwrap();
        let dev = DeviceInfo::spi("/dev/spidev-sim", "ak0991x");
        let mut inst = Ak0991xCore.probe(&dev, regmap, None, "ak0991x").unwrap();
        assert_eq!(inst.variant(), Ak0991xVariant::Ak09915);
        let s = inst.read_raw().unwrap();
        assert_eq!((s.x, s.y, s.z), (-1, 2, -3));
    }

    #[test]
    fn test_remove_powers_down() {
        let (mut inst, chip) = probe_i2c(Ak0991xVariant::Ak09918);
        inst.set_mode(MeasurementMode::Continuous).unwrap();
        Ak0991xCore.remove(inst).unwrap();
        assert_eq!(chip.lock().mode(), reg::MODE_POWER_DOWN);
    }
}
