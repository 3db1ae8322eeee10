//! Contract between bus glue and a sensor core

use std::fmt;
use std::thread;
use std::time::Duration;

use akm_transport::DeviceInfo;
use serde::Serialize;
use zerocopy::little_endian::I16;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use crate::error::SensorError;

/// Entry points a bus driver calls into
///
/// `A` is the register-access handle the bus glue builds: a
/// [`Regmap`](akm_transport::Regmap) for the AK0991X family, boxed
/// [`BusOps`](akm_transport::BusOps) for the AK8963. The instance returned
/// by `probe` is the driver data: the bus driver owns it until `remove`.
pub trait SensorCore<A>: Send + Sync {
    type Instance: Send + 'static;

    /// Identify and initialize the chip
    ///
    /// # Arguments
    /// * `dev` - Bus location of the device
    /// * `access` - Register access handle, moved into the instance
    /// * `irq` - Interrupt line, if one is wired
    /// * `name` - Matched device-table name
    fn probe(
        &self,
        dev: &DeviceInfo,
        access: A,
        irq: Option<u32>,
        name: &str,
    ) -> Result<Self::Instance, SensorError>;

    /// Shut the chip down and release the instance
    fn remove(&self, instance: Self::Instance) -> Result<(), SensorError>;

    /// Enter low power, remembering the active mode
    fn suspend(&self, instance: &mut Self::Instance) -> Result<(), SensorError>;

    /// Restore the mode saved by `suspend`
    fn resume(&self, instance: &mut Self::Instance) -> Result<(), SensorError>;
}

/// Operating mode, chip-independent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementMode {
    PowerDown,
    Single,
    Continuous,
    SelfTest,
}

impl fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeasurementMode::PowerDown => "power-down",
            MeasurementMode::Single => "single",
            MeasurementMode::Continuous => "continuous",
            MeasurementMode::SelfTest => "self-test",
        };
        f.write_str(s)
    }
}

/// Raw measurement, in sensor counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// Magnetic sensor overflow (HOFL)
    pub overflow: bool,
}

/// X/Y/Z output registers as laid out on every AKM part
#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct AxisRegisters {
    x: I16,
    y: I16,
    z: I16,
}

impl RawSample {
    /// Decode the six HXL..HZH bytes plus the ST2 status byte
    pub fn parse(axes: &[u8], st2: u8, hofl_mask: u8) -> Result<Self, SensorError> {
        let regs = AxisRegisters::read_from_bytes(axes)
            .map_err(|_| SensorError::Malformed(format!("{}-byte axis block", axes.len())))?;
        Ok(Self {
            x: regs.x.get(),
            y: regs.y.get(),
            z: regs.z.get(),
            overflow: st2 & hofl_mask != 0,
        })
    }
}

impl fmt::Display for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={:6} y={:6} z={:6}", self.x, self.y, self.z)?;
        if self.overflow {
            f.write_str(" (overflow)")?;
        }
        Ok(())
    }
}

/// Runtime view of a bound magnetometer
pub trait Magnetometer: Send {
    /// Identified part name, e.g. `AK09918`
    fn chip(&self) -> &'static str;

    fn device(&self) -> &DeviceInfo;

    fn irq(&self) -> Option<u32>;

    fn is_suspended(&self) -> bool;

    fn mode(&mut self) -> Result<MeasurementMode, SensorError>;

    fn set_mode(&mut self, mode: MeasurementMode) -> Result<(), SensorError>;

    /// Take one raw measurement
    ///
    /// In power-down a single measurement is triggered first; in
    /// continuous mode the next available sample is returned.
    fn read_raw(&mut self) -> Result<RawSample, SensorError>;
}

/// DRDY polling budget; single measurements finish in under 10 ms
pub(crate) const DRDY_POLLS: u32 = 20;
pub(crate) const DRDY_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Poll `is_ready` until it reports true or the budget runs out
pub(crate) fn wait_ready<F>(mut is_ready: F) -> Result<(), SensorError>
where
    F: FnMut() -> Result<bool, SensorError>,
{
    for _ in 0..DRDY_POLLS {
        if is_ready()? {
            return Ok(());
        }
        thread::sleep(DRDY_POLL_INTERVAL);
    }
    Err(SensorError::NotReady(DRDY_POLLS))
}
