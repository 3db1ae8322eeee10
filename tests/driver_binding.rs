//! Integration tests for driver binding.
//!
//! These drive the default registry against emulated chips: matching,
//! probe error codes, sample readout, power management and unbinding.

use std::sync::Arc;

use akm_driver::{
    attach_all, default_registry, instantiate, BoardConfig, DriverError, I2cClient, MatchSource,
    SpiClient, MAX_SPI_FREQ_HZ,
};
use akm_sensor::{Ak0991xVariant, MeasurementMode, SimAk0991x, SimAk8963};
use akm_transport::{I2cFunctionality, SimControl, SimI2cAdapter, SimSpiDevice};
use parking_lot::Mutex;

const AK0991X_CONT_1: u8 = 0x02;

fn ak0991x_i2c(
    variant: Ak0991xVariant,
    name: &str,
) -> (I2cClient, Arc<Mutex<SimAk0991x>>, SimControl) {
    let chip = Arc::new(Mutex::new(SimAk0991x::new(variant)));
    let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone());
    let control = adapter.control();
    (I2cClient::new(Box::new(adapter), 0x0c, name), chip, control)
}

fn ak0991x_spi(hz: u32, name: &str) -> (SpiClient, Arc<Mutex<SimAk0991x>>, SimControl) {
    let chip = Arc::new(Mutex::new(SimAk0991x::new(Ak0991xVariant::Ak09915)));
    let spi = SimSpiDevice::new("/dev/spidev-sim0.0", hz, chip.clone());
    let control = spi.control();
    (SpiClient::new(Box::new(spi), name), chip, control)
}

fn ak8963_i2c() -> (I2cClient, Arc<Mutex<SimAk8963>>, SimControl) {
    let chip = Arc::new(Mutex::new(SimAk8963::new()));
    let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone());
    let control = adapter.control();
    (I2cClient::new(Box::new(adapter), 0x0c, "ak8963"), chip, control)
}

// ── Matching ──

#[test]
fn demo_board_binds_every_device() {
    let mut registry = default_registry();
    let devices = instantiate(&BoardConfig::demo(), true).unwrap();
    let attached = attach_all(&mut registry, devices);

    assert_eq!(attached.len(), 3);
    assert!(attached.iter().all(|a| a.result.is_ok()));

    let chips: Vec<_> = registry.magnetometers().map(|(_, m)| m.chip()).collect();
    assert_eq!(chips, ["AK09918", "AK8963", "AK09915"]);

    let drivers: Vec<_> = registry.devices().iter().map(|d| d.driver).collect();
    assert_eq!(drivers, ["ak0991x", "ak8963", "ak0991x"]);
}

#[test]
fn id_table_match_by_name() {
    let mut registry = default_registry();
    let (client, _chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09911, "ak0991x");
    let handle = registry.add_i2c_device(client).unwrap();

    let summary = registry.device(handle).unwrap();
    assert_eq!(summary.matched_by, MatchSource::IdTable);
    assert_eq!(summary.info.location, "/dev/i2c-sim@0x0c");
    assert_eq!(registry.magnetometer(handle).unwrap().chip(), "AK09911");
}

#[test]
fn of_match_reports_source() {
    let mut registry = default_registry();
    let (client, _chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    let handle = registry
        .add_i2c_device(client.with_compatible("asahi-kasei,ak09918").with_irq(17))
        .unwrap();
    let summary = registry.device(handle).unwrap();
    assert_eq!(summary.matched_by, MatchSource::Of);
    assert_eq!(summary.irq, Some(17));
    assert_eq!(registry.magnetometer(handle).unwrap().irq(), Some(17));
}

#[test]
fn acpi_match_binds() {
    let mut registry = default_registry();
    let (client, _chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09916C, "ak0991x");
    let handle = registry
        .add_i2c_device(client.with_acpi_id("ak0991x"))
        .unwrap();
    assert_eq!(registry.device(handle).unwrap().matched_by, MatchSource::Acpi);
}

#[test]
fn of_match_without_name_entry_is_enodev() {
    // Matched through the compatible string, but probe only receives an id
    // when the device name is in the id table
    let mut registry = default_registry();
    let (client, chip, control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak09918");
    let err = registry
        .add_i2c_device(client.with_compatible("asahi-kasei,ak09918"))
        .unwrap_err();

    assert!(matches!(err, DriverError::NoDeviceId(_)));
    assert_eq!(err.errno(), -libc::ENODEV);
    assert!(control.transactions().is_empty());
    assert_eq!(chip.lock().resets(), 0);
    assert!(registry.is_empty());
}

#[test]
fn unknown_device_has_no_driver() {
    let mut registry = default_registry();
    let (client, _chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "bmm150");
    let err = registry.add_i2c_device(client).unwrap_err();
    assert!(matches!(err, DriverError::NoDriver(_)));
}

#[test]
fn ak8963_routes_to_its_own_driver() {
    let mut registry = default_registry();
    let (client, chip, _control) = ak8963_i2c();
    let handle = registry.add_i2c_device(client).unwrap();
    assert_eq!(registry.device(handle).unwrap().driver, "ak8963");
    assert_eq!(chip.lock().resets(), 1);
}

// ── Probe failures ──

#[test]
fn spi_clock_above_limit_is_einval() {
    let mut registry = default_registry();
    let (spi, _chip, control) = ak0991x_spi(MAX_SPI_FREQ_HZ + 500_000, "ak0991x");
    let err = registry.add_spi_device(spi).unwrap_err();
    assert_eq!(err.errno(), -libc::EINVAL);
    assert!(control.transactions().is_empty());

    let (spi, _chip, _control) = ak0991x_spi(MAX_SPI_FREQ_HZ, "ak0991x");
    registry.add_spi_device(spi).unwrap();
}

#[test]
fn wrong_chip_on_bus_is_enodev() {
    let mut registry = default_registry();
    let (client, chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    chip.lock().set_company_id(0x10);
    let err = registry.add_i2c_device(client).unwrap_err();
    assert_eq!(err.errno(), -libc::ENODEV);
}

#[test]
fn ak8963_bus_errors_propagate() {
    let mut registry = default_registry();

    let (client, _chip, control) = ak8963_i2c();
    control.fail_next_transfer(libc::EREMOTEIO);
    let err = registry.add_i2c_device(client).unwrap_err();
    assert_eq!(err.errno(), -libc::EREMOTEIO);

    let (client, _chip, control) = ak8963_i2c();
    control.short_next_transfer();
    let err = registry.add_i2c_device(client).unwrap_err();
    assert_eq!(err.errno(), -libc::ENXIO);
}

#[test]
fn ak8963_needs_plain_i2c() {
    let mut registry = default_registry();
    let chip = Arc::new(Mutex::new(SimAk8963::new()));
    let adapter = SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip)
        .with_functionality(I2cFunctionality::SMBUS_BYTE_DATA);
    let client = I2cClient::new(Box::new(adapter), 0x0c, "ak8963");
    let err = registry.add_i2c_device(client).unwrap_err();
    assert!(matches!(err, DriverError::MissingFunctionality { .. }));
    assert_eq!(err.errno(), -libc::ENODEV);
}

#[test]
fn ak0991x_falls_back_to_smbus() {
    let mut registry = default_registry();
    for funcs in [
        I2cFunctionality::SMBUS_I2C_BLOCK.union(I2cFunctionality::SMBUS_BYTE_DATA),
        I2cFunctionality::SMBUS_BYTE_DATA,
    ] {
        let chip = Arc::new(Mutex::new(SimAk0991x::new(Ak0991xVariant::Ak09918)));
        chip.lock().set_field(-7, 0, 7);
        let adapter =
            SimI2cAdapter::new("/dev/i2c-sim", 0x0c, chip.clone()).with_functionality(funcs);
        let client = I2cClient::new(Box::new(adapter), 0x0c, "ak0991x");
        let handle = registry.add_i2c_device(client).unwrap();

        let mag = registry.magnetometer(handle).unwrap();
        assert_eq!(mag.chip(), "AK09918");
        let sample = mag.read_raw().unwrap();
        assert_eq!((sample.x, sample.y, sample.z), (-7, 0, 7));
        registry.remove_device(handle).unwrap();
        assert_eq!(chip.lock().mode(), 0);
    }
}

// ── Readout ──

#[test]
fn raw_samples_through_registry() {
    let mut registry = default_registry();
    let (client, chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    let handle = registry.add_i2c_device(client).unwrap();
    chip.lock().set_field(120, -45, 3000);

    let sample = registry.magnetometer(handle).unwrap().read_raw().unwrap();
    assert_eq!((sample.x, sample.y, sample.z), (120, -45, 3000));
    assert!(!sample.overflow);

    let (client, chip, _control) = ak8963_i2c();
    let handle = registry.add_i2c_device(client).unwrap();
    chip.lock().set_field(-1, 2, -3);
    chip.lock().set_overflow(true);
    let sample = registry.magnetometer(handle).unwrap().read_raw().unwrap();
    assert_eq!((sample.x, sample.y, sample.z), (-1, 2, -3));
    assert!(sample.overflow);
}

#[test]
fn ak09911_has_no_continuous_mode() {
    let mut registry = default_registry();
    let (client, chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09911, "ak0991x");
    let handle = registry.add_i2c_device(client).unwrap();
    let mag = registry.magnetometer(handle).unwrap();

    let err = mag.set_mode(MeasurementMode::Continuous).unwrap_err();
    assert_eq!(err.errno(), -libc::EINVAL);
    assert_eq!(chip.lock().mode(), 0);
    assert!(mag.read_raw().is_ok());
}

#[test]
fn spi_register_reads_set_bit7() {
    let mut registry = default_registry();
    let (spi, chip, control) = ak0991x_spi(1_000_000, "ak0991x");
    let handle = registry.add_spi_device(spi).unwrap();
    chip.lock().set_field(7, 8, 9);
    control.clear();

    let sample = registry.magnetometer(handle).unwrap().read_raw().unwrap();
    assert_eq!((sample.x, sample.y, sample.z), (7, 8, 9));

    for transaction in control.transactions() {
        let first = transaction[0].data[0];
        if transaction.len() == 2 {
            assert_ne!(first & 0x80, 0, "read without flag: {transaction:?}");
        } else {
            assert_eq!(first & 0x80, 0, "write with flag: {transaction:?}");
        }
    }
}

// ── Power management ──

#[test]
fn suspend_resume_restores_continuous_mode() {
    let mut registry = default_registry();
    let (client, chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    let handle = registry.add_i2c_device(client).unwrap();
    registry
        .magnetometer(handle)
        .unwrap()
        .set_mode(MeasurementMode::Continuous)
        .unwrap();
    assert_eq!(chip.lock().mode(), AK0991X_CONT_1);

    registry.suspend_all().unwrap();
    assert_eq!(chip.lock().mode(), 0);
    let mag = registry.magnetometer(handle).unwrap();
    assert!(mag.is_suspended());
    assert!(mag.read_raw().is_err());

    registry.resume_all().unwrap();
    assert_eq!(chip.lock().mode(), AK0991X_CONT_1);
    assert!(!registry.magnetometer(handle).unwrap().is_suspended());
}

#[test]
fn resume_leaves_power_down_alone() {
    let mut registry = default_registry();
    let (client, chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    registry.add_i2c_device(client).unwrap();
    let writes = chip.lock().mode_writes();

    registry.suspend_all().unwrap();
    registry.resume_all().unwrap();
    // Only the power-down written by suspend
    assert_eq!(chip.lock().mode_writes(), writes + 1);
    assert_eq!(chip.lock().mode(), 0);
}

#[test]
fn failed_suspend_resumes_the_others() {
    let mut registry = default_registry();
    let (first, first_chip, _c1) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    let (second, _second_chip, second_control) = ak8963_i2c();
    let first = registry.add_i2c_device(first).unwrap();
    registry.add_i2c_device(second).unwrap();

    registry
        .magnetometer(first)
        .unwrap()
        .set_mode(MeasurementMode::Continuous)
        .unwrap();

    // The AK8963 was bound last, so it is suspended first and fails there
    second_control.fail_next_transfer(libc::EIO);
    assert!(registry.suspend_all().is_err());
    assert!(registry.devices().iter().all(|d| !d.suspended));
    assert_eq!(first_chip.lock().mode(), AK0991X_CONT_1);
}

#[test]
fn failed_resume_is_retried_by_the_next_resume_all() {
    let mut registry = default_registry();
    let (client, chip, control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    let handle = registry.add_i2c_device(client).unwrap();
    registry
        .magnetometer(handle)
        .unwrap()
        .set_mode(MeasurementMode::Continuous)
        .unwrap();
    registry.suspend_all().unwrap();

    control.fail_next_transfer(libc::EIO);
    let err = registry.resume_all().unwrap_err();
    assert_eq!(err.errno(), -libc::EIO);
    assert!(registry.device(handle).unwrap().suspended);
    assert!(registry.magnetometer(handle).unwrap().is_suspended());
    assert_eq!(chip.lock().mode(), 0);

    registry.resume_all().unwrap();
    assert_eq!(chip.lock().mode(), AK0991X_CONT_1);
    assert!(!registry.device(handle).unwrap().suspended);
    assert!(!registry.magnetometer(handle).unwrap().is_suspended());
}

#[test]
fn failed_rollback_leaves_device_suspended() {
    let mut registry = default_registry();
    let (ak8963, _ak8963_chip, ak8963_control) = ak8963_i2c();
    let (ak09918, chip, control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    registry.add_i2c_device(ak8963).unwrap();
    let handle = registry.add_i2c_device(ak09918).unwrap();
    registry
        .magnetometer(handle)
        .unwrap()
        .set_mode(MeasurementMode::Continuous)
        .unwrap();

    // The AK09918 suspends (CNTL2 read and write), the AK8963 then fails,
    // and restoring the AK09918 fails as well
    control.fail_transfer_after(2, libc::EIO);
    ak8963_control.fail_next_transfer(libc::EIO);
    assert!(registry.suspend_all().is_err());
    assert!(registry.device(handle).unwrap().suspended);
    assert_eq!(chip.lock().mode(), 0);

    registry.resume_all().unwrap();
    assert_eq!(chip.lock().mode(), AK0991X_CONT_1);
    assert!(registry.devices().iter().all(|d| !d.suspended));
}

// ── Unbinding ──

#[test]
fn remove_powers_down() {
    let mut registry = default_registry();
    let (client, chip, _control) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    let handle = registry.add_i2c_device(client).unwrap();
    registry
        .magnetometer(handle)
        .unwrap()
        .set_mode(MeasurementMode::Continuous)
        .unwrap();

    registry.remove_device(handle).unwrap();
    assert_eq!(chip.lock().mode(), 0);
    assert!(registry.magnetometer(handle).is_none());
    assert!(matches!(
        registry.remove_device(handle),
        Err(DriverError::NotBound(_))
    ));
}

#[test]
fn shutdown_unbinds_everything() {
    let mut registry = default_registry();
    let (a, chip_a, _ca) = ak0991x_i2c(Ak0991xVariant::Ak09918, "ak0991x");
    let (b, _chip_b, _cb) = ak8963_i2c();
    let a = registry.add_i2c_device(a).unwrap();
    registry.add_i2c_device(b).unwrap();
    registry
        .magnetometer(a)
        .unwrap()
        .set_mode(MeasurementMode::Continuous)
        .unwrap();

    registry.shutdown().unwrap();
    assert!(registry.is_empty());
    assert_eq!(chip_a.lock().mode(), 0);
}
