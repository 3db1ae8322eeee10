//! Sensor cores for AKM magnetometers
//!
//! This crate defines the [`SensorCore`] contract bus drivers call into and
//! provides the cores for the AK0991X family and the AK8963. The cores only
//! identify the part and manage its power mode; raw samples are exposed in
//! sensor counts without any sensitivity correction.

pub mod ak0991x;
pub mod ak8963;
pub mod sensor_core;
pub mod error;
pub mod registers;
pub mod sim;

pub use ak0991x::{Ak0991xCore, Ak0991xDevice, Ak0991xVariant};
pub use ak8963::{Ak8963Core, Ak8963Device, AK8963_NAME};
pub use sensor_core::{Magnetometer, MeasurementMode, RawSample, SensorCore};
pub use error::SensorError;
pub use sim::{SimAk0991x, SimAk8963};
