//! Sensor-fusion driver trait
//!
//! The fusion engine itself is opaque: implementations own the bus link, the
//! sub-sensor pipelines and the orientation filter. The session only ever
//! talks to a driver through this trait.

use crate::error::Result;
use crate::settings::ImuSettings;
use crate::types::FusionData;

/// Sensor-fusion IMU driver
pub trait FusionDriver: Send {
    /// Apply parsed settings to the driver handle
    ///
    /// Called once while the session is constructed, before `init`. Must not
    /// touch the physical link.
    fn configure(&mut self, settings: &ImuSettings) -> Result<()> {
        let _ = settings;
        Ok(())
    }

    /// Bring up the physical link and the fusion engine
    fn init(&mut self) -> Result<()>;

    /// Minimum delay between reads, in milliseconds. Valid after `init`.
    fn poll_interval_ms(&self) -> u32;

    /// Feed or detach the magnetometer from the fusion engine
    fn set_compass_enabled(&mut self, enabled: bool);

    /// Feed or detach the gyroscope from the fusion engine
    fn set_gyro_enabled(&mut self, enabled: bool);

    /// Feed or detach the accelerometer from the fusion engine
    fn set_accel_enabled(&mut self, enabled: bool);

    /// Pull one new sample. Returns `false` when no sample was ready.
    fn read(&mut self) -> bool;

    /// Latest sample with per-field validity flags
    fn data(&self) -> FusionData;
}

impl<D: FusionDriver + ?Sized> FusionDriver for Box<D> {
    fn configure(&mut self, settings: &ImuSettings) -> Result<()> {
        (**self).configure(settings)
    }

    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn poll_interval_ms(&self) -> u32 {
        (**self).poll_interval_ms()
    }

    fn set_compass_enabled(&mut self, enabled: bool) {
        (**self).set_compass_enabled(enabled)
    }

    fn set_gyro_enabled(&mut self, enabled: bool) {
        (**self).set_gyro_enabled(enabled)
    }

    fn set_accel_enabled(&mut self, enabled: bool) {
        (**self).set_accel_enabled(enabled)
    }

    fn read(&mut self) -> bool {
        (**self).read()
    }

    fn data(&self) -> FusionData {
        (**self).data()
    }
}
