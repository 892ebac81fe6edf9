//! IMU session: lifecycle, sub-sensor enablement and cached readings
//!
//! An [`ImuSession`] owns one fusion driver and:
//!
//! - initializes it lazily on the first call that needs it, exactly once
//! - forwards sub-sensor enable/disable changes only when a flag changes
//! - reads with a bounded retry (3 attempts, one poll interval apart)
//! - remembers the last good value of every reading, so a failed read
//!   answers with the previous value instead of an error
//!
//! # Capability side effects
//!
//! [`ImuSession::get_compass`], [`ImuSession::get_gyroscope`] and
//! [`ImuSession::get_accelerometer`] switch the fusion inputs to a single
//! sub-sensor before reading and leave them that way. Interleaving them with
//! other readers toggles the driver back and forth. Callers that need a
//! fixed input set should call [`ImuSession::set_imu_config`] themselves and
//! stick to the raw and orientation readers.
//!
//! # Threading
//!
//! A session is single-owner. Wrap it in a [`SharedImuSession`] to use it
//! from several threads; the whole session sits behind one lock.

use crate::bus;
use crate::driver::FusionDriver;
use crate::error::{Error, Result};
use crate::settings::{self, ImuSettings, SettingsLocation};
use crate::step::StepDetector;
use crate::types::{CapabilitySet, FlagValue, ImuField, Orientation, Vector3};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Read attempts before a read is given up
pub const READ_ATTEMPTS: u32 = 3;

/// Default IMU bus address
pub const DEFAULT_I2C_ADDRESS: u8 = 0x6A;

/// Driver initialization state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// No init attempted yet
    Uninitialized,
    /// Init succeeded
    Ready {
        /// Delay after every read attempt
        poll_interval: Duration,
    },
    /// Init failed; never retried
    Failed,
}

/// Polling session around one fusion driver
pub struct ImuSession<D: FusionDriver> {
    driver: D,
    i2c_address: u8,
    settings_path: Option<PathBuf>,
    init_state: InitState,
    capabilities: CapabilitySet,
    last_orientation: Orientation,
    last_compass_raw: Vector3,
    last_gyro_raw: Vector3,
    last_accel_raw: Vector3,
}

impl<D: FusionDriver> ImuSession<D> {
    /// Create a session
    ///
    /// Checks that an I2C bus exists under `bus_dir`, resolves the settings
    /// file (seeding it from the system template if needed), writes
    /// `i2c_address` into it and hands the parsed settings to the driver.
    /// The driver is not initialized here; that happens on first read.
    pub fn new(
        driver: D,
        i2c_address: u8,
        location: &SettingsLocation,
        bus_dir: &Path,
    ) -> Result<Self> {
        bus::ensure_i2c_bus(bus_dir)?;

        let settings_path = location.resolve()?;
        settings::patch_i2c_address(&settings_path, i2c_address)?;
        let imu_settings = ImuSettings::load(&settings_path)?;

        let mut session = Self::with_driver(driver, i2c_address);
        session.driver.configure(&imu_settings)?;
        session.settings_path = Some(settings_path);

        log::info!(
            "IMU session created (address {:#04x}, settings {})",
            i2c_address,
            location.home_file().display()
        );
        Ok(session)
    }

    fn with_driver(driver: D, i2c_address: u8) -> Self {
        Self {
            driver,
            i2c_address,
            settings_path: None,
            init_state: InitState::Uninitialized,
            capabilities: CapabilitySet::NONE,
            last_orientation: Orientation::ZERO,
            last_compass_raw: Vector3::ZERO,
            last_gyro_raw: Vector3::ZERO,
            last_accel_raw: Vector3::ZERO,
        }
    }

    pub fn i2c_address(&self) -> u8 {
        self.i2c_address
    }

    /// Per-user settings file the driver was configured from
    pub fn settings_path(&self) -> Option<&Path> {
        self.settings_path.as_deref()
    }

    pub fn init_state(&self) -> InitState {
        self.init_state
    }

    /// Sub-sensors currently feeding the fusion engine
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// Poll interval, once initialized
    pub fn poll_interval(&self) -> Option<Duration> {
        match self.init_state {
            InitState::Ready { poll_interval } => Some(poll_interval),
            _ => None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Initialize the driver if that has not happened yet
    fn ensure_init(&mut self) -> Result<Duration> {
        match self.init_state {
            InitState::Ready { poll_interval } => Ok(poll_interval),
            InitState::Failed => Err(Error::InitFailed(
                "an earlier initialization attempt failed".to_string(),
            )),
            InitState::Uninitialized => {
                if let Err(e) = self.driver.init() {
                    log::error!("IMU init failed: {}", e);
                    self.init_state = InitState::Failed;
                    return Err(match e {
                        Error::InitFailed(_) => e,
                        other => Error::InitFailed(other.to_string()),
                    });
                }

                let poll_interval = Duration::from_millis(u64::from(self.driver.poll_interval_ms()));
                self.init_state = InitState::Ready { poll_interval };
                log::info!("IMU initialized (poll interval {:?})", poll_interval);

                self.apply_capabilities(CapabilitySet::ALL);
                Ok(poll_interval)
            }
        }
    }

    /// Enable or disable the magnetometer, gyroscope and accelerometer as
    /// fusion inputs.
    ///
    /// Only flags whose value changes are sent to the driver; repeating the
    /// current set is free.
    pub fn set_imu_config(&mut self, compass: bool, gyro: bool, accel: bool) -> Result<()> {
        self.ensure_init()?;
        let requested = CapabilitySet::new(compass, gyro, accel);
        let writes = self.apply_capabilities(requested);
        log::trace!("IMU config {:?}: {} driver writes", requested, writes);
        Ok(())
    }

    /// [`set_imu_config`](Self::set_imu_config) for dynamically typed flags
    ///
    /// Every flag must be [`FlagValue::Bool`]; anything else is rejected with
    /// [`Error::InvalidParameter`] before the driver is touched.
    pub fn set_imu_config_values(
        &mut self,
        compass: &FlagValue,
        gyro: &FlagValue,
        accel: &FlagValue,
    ) -> Result<()> {
        match (compass.as_bool(), gyro.as_bool(), accel.as_bool()) {
            (Some(compass), Some(gyro), Some(accel)) => self.set_imu_config(compass, gyro, accel),
            _ => Err(Error::InvalidParameter(format!(
                "All set_imu_config parameters must be of boolean type (got {}, {}, {})",
                compass.type_name(),
                gyro.type_name(),
                accel.type_name()
            ))),
        }
    }

    /// Send the flags that differ from the current set. Returns the number
    /// of driver writes issued.
    fn apply_capabilities(&mut self, requested: CapabilitySet) -> usize {
        let mut writes = 0;

        if self.capabilities.compass != requested.compass {
            self.capabilities.compass = requested.compass;
            self.driver.set_compass_enabled(requested.compass);
            log::debug!("IMU compass enabled: {}", requested.compass);
            writes += 1;
        }

        if self.capabilities.gyro != requested.gyro {
            self.capabilities.gyro = requested.gyro;
            self.driver.set_gyro_enabled(requested.gyro);
            log::debug!("IMU gyro enabled: {}", requested.gyro);
            writes += 1;
        }

        if self.capabilities.accel != requested.accel {
            self.capabilities.accel = requested.accel;
            self.driver.set_accel_enabled(requested.accel);
            log::debug!("IMU accel enabled: {}", requested.accel);
            writes += 1;
        }

        writes
    }

    /// Pull a new sample, trying up to [`READ_ATTEMPTS`] times.
    ///
    /// Sleeps one poll interval after every attempt, including the
    /// successful one.
    fn read_imu(&mut self) -> Result<bool> {
        let poll_interval = self.ensure_init()?;

        let mut attempts = 0;
        let mut success = false;

        while !success && attempts < READ_ATTEMPTS {
            success = self.driver.read();
            attempts += 1;
            if !success {
                log::debug!("IMU read attempt {}/{} failed", attempts, READ_ATTEMPTS);
            }
            thread::sleep(poll_interval);
        }

        if !success {
            log::warn!("IMU read failed after {} attempts", READ_ATTEMPTS);
        }
        Ok(success)
    }

    /// Read `field` if a sample arrives and the driver marks the field valid
    fn get_raw_data(&mut self, field: ImuField) -> Result<Option<Vector3>> {
        if !self.read_imu()? {
            return Ok(None);
        }

        let data = self.driver.data();
        if !data.is_valid(field) {
            log::warn!("IMU field {} not valid", field.valid_key());
            return Ok(None);
        }
        Ok(Some(data.vector(field)))
    }

    /// Orientation in radians on the aircraft principal axes
    pub fn get_orientation_radians(&mut self) -> Result<Orientation> {
        if let Some(pose) = self.get_raw_data(ImuField::FusionPose)? {
            self.last_orientation = Orientation::from_fusion_pose(pose);
        }
        Ok(self.last_orientation)
    }

    /// Orientation in degrees, every axis in [0, 360)
    pub fn get_orientation_degrees(&mut self) -> Result<Orientation> {
        Ok(self.get_orientation_radians()?.to_degrees())
    }

    /// Direction of north from the magnetometer, in degrees
    ///
    /// Leaves the fusion inputs set to compass only.
    pub fn get_compass(&mut self) -> Result<f64> {
        self.set_imu_config(true, false, false)?;
        Ok(self.get_orientation_degrees()?.yaw)
    }

    /// Magnetometer x/y/z in µT
    pub fn get_compass_raw(&mut self) -> Result<Vector3> {
        if let Some(raw) = self.get_raw_data(ImuField::Compass)? {
            self.last_compass_raw = raw;
        }
        Ok(self.last_compass_raw)
    }

    /// Orientation in degrees from the gyroscope only
    ///
    /// Leaves the fusion inputs set to gyro only.
    pub fn get_gyroscope(&mut self) -> Result<Orientation> {
        self.set_imu_config(false, true, false)?;
        self.get_orientation_degrees()
    }

    /// Gyroscope x/y/z in rad/s
    pub fn get_gyroscope_raw(&mut self) -> Result<Vector3> {
        if let Some(raw) = self.get_raw_data(ImuField::Gyro)? {
            self.last_gyro_raw = raw;
        }
        Ok(self.last_gyro_raw)
    }

    /// Orientation in degrees from the accelerometer only
    ///
    /// Leaves the fusion inputs set to accel only.
    pub fn get_accelerometer(&mut self) -> Result<Orientation> {
        self.set_imu_config(false, false, true)?;
        self.get_orientation_degrees()
    }

    /// Accelerometer x/y/z in Gs
    pub fn get_accelerometer_raw(&mut self) -> Result<Vector3> {
        if let Some(raw) = self.get_raw_data(ImuField::Accel)? {
            self.last_accel_raw = raw;
        }
        Ok(self.last_accel_raw)
    }

    /// Feed the next accelerometer reading to `detector`
    ///
    /// Returns true when the reading completes a step. A failed read feeds
    /// the cached value, which cannot start a new step on its own.
    pub fn detect_step(&mut self, detector: &mut StepDetector) -> Result<bool> {
        let accel = self.get_accelerometer_raw()?;
        Ok(detector.update(accel))
    }
}

/// An [`ImuSession`] shared between threads behind a single lock
///
/// Every reader and the capability update run under the same lock, so a
/// `set_imu_config` followed by a read inside [`with`](Self::with) always
/// sees the set it just applied.
pub struct SharedImuSession<D: FusionDriver> {
    inner: Arc<Mutex<ImuSession<D>>>,
}

impl<D: FusionDriver> SharedImuSession<D> {
    pub fn new(session: ImuSession<D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut ImuSession<D>) -> R) -> R {
        let mut session = self.inner.lock();
        f(&mut session)
    }

    /// Lock the session for a longer sequence of calls
    pub fn lock(&self) -> MutexGuard<'_, ImuSession<D>> {
        self.inner.lock()
    }
}

impl<D: FusionDriver> Clone for SharedImuSession<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FusionData;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        Init,
        Compass(bool),
        Gyro(bool),
        Accel(bool),
        Read,
    }

    /// Driver that replays scripted read results and records every call
    #[derive(Default)]
    struct ScriptedDriver {
        calls: Vec<Call>,
        fail_init: bool,
        reads: VecDeque<bool>,
        sample: FusionData,
    }

    impl ScriptedDriver {
        fn writes(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Compass(_) | Call::Gyro(_) | Call::Accel(_)))
                .count()
        }

        fn reads(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Read).count()
        }
    }

    impl FusionDriver for ScriptedDriver {
        fn init(&mut self) -> Result<()> {
            self.calls.push(Call::Init);
            if self.fail_init {
                Err(Error::Other("no IMU detected".to_string()))
            } else {
                Ok(())
            }
        }

        fn poll_interval_ms(&self) -> u32 {
            1
        }

        fn set_compass_enabled(&mut self, enabled: bool) {
            self.calls.push(Call::Compass(enabled));
        }

        fn set_gyro_enabled(&mut self, enabled: bool) {
            self.calls.push(Call::Gyro(enabled));
        }

        fn set_accel_enabled(&mut self, enabled: bool) {
            self.calls.push(Call::Accel(enabled));
        }

        fn read(&mut self) -> bool {
            self.calls.push(Call::Read);
            self.reads.pop_front().unwrap_or(true)
        }

        fn data(&self) -> FusionData {
            self.sample
        }
    }

    fn session() -> ImuSession<ScriptedDriver> {
        ImuSession::with_driver(ScriptedDriver::default(), DEFAULT_I2C_ADDRESS)
    }

    #[test]
    fn test_lazy_init_enables_everything_once() {
        let mut s = session();
        assert_eq!(s.init_state(), InitState::Uninitialized);
        assert!(s.driver().calls.is_empty());

        s.set_imu_config(true, true, true).unwrap();
        assert_eq!(
            s.driver().calls,
            vec![
                Call::Init,
                Call::Compass(true),
                Call::Gyro(true),
                Call::Accel(true)
            ]
        );
        assert_eq!(s.poll_interval(), Some(Duration::from_millis(1)));
        assert_eq!(s.capabilities(), CapabilitySet::ALL);

        s.get_accelerometer_raw().unwrap();
        let inits = s.driver().calls.iter().filter(|c| **c == Call::Init).count();
        assert_eq!(inits, 1);
    }

    #[test]
    fn test_failed_init_is_not_retried() {
        let mut s = ImuSession::with_driver(
            ScriptedDriver {
                fail_init: true,
                ..Default::default()
            },
            DEFAULT_I2C_ADDRESS,
        );

        assert!(matches!(s.get_orientation_radians(), Err(Error::InitFailed(_))));
        assert_eq!(s.init_state(), InitState::Failed);
        assert!(matches!(s.get_compass_raw(), Err(Error::InitFailed(_))));
        assert!(matches!(
            s.set_imu_config(true, false, false),
            Err(Error::InitFailed(_))
        ));
        assert_eq!(s.driver().calls, vec![Call::Init]);
    }

    #[test]
    fn test_repeated_config_issues_no_writes() {
        let mut s = session();
        s.set_imu_config(false, true, false).unwrap();
        let before = s.driver().writes();
        s.set_imu_config(false, true, false).unwrap();
        assert_eq!(s.driver().writes(), before);
    }

    #[test]
    fn test_write_count_matches_changed_flags() {
        let all: Vec<CapabilitySet> = (0..8u8)
            .map(|b| CapabilitySet::new(b & 1 != 0, b & 2 != 0, b & 4 != 0))
            .collect();

        for from in &all {
            for to in &all {
                let mut s = session();
                s.set_imu_config(from.compass, from.gyro, from.accel).unwrap();
                let before = s.driver().writes();

                s.set_imu_config(to.compass, to.gyro, to.accel).unwrap();
                let expected = usize::from(from.compass != to.compass)
                    + usize::from(from.gyro != to.gyro)
                    + usize::from(from.accel != to.accel);
                assert_eq!(s.driver().writes() - before, expected, "{:?} -> {:?}", from, to);
                assert_eq!(s.capabilities(), *to);
            }
        }
    }

    #[test]
    fn test_non_bool_flag_rejected_before_driver() {
        let mut s = session();
        let err = s
            .set_imu_config_values(&FlagValue::Int(1), &true.into(), &true.into())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(s.driver().calls.is_empty());
        assert_eq!(s.init_state(), InitState::Uninitialized);

        s.set_imu_config_values(&true.into(), &false.into(), &true.into())
            .unwrap();
        assert_eq!(s.capabilities(), CapabilitySet::new(true, false, true));
    }

    #[test]
    fn test_retry_stops_on_first_success() {
        let mut s = session();
        s.driver_mut().reads = VecDeque::from(vec![false, true, false]);
        assert!(s.read_imu().unwrap());
        assert_eq!(s.driver().reads(), 2);
    }

    #[test]
    fn test_retry_gives_up_after_three() {
        let mut s = session();
        s.driver_mut().reads = VecDeque::from(vec![false; 5]);
        assert!(!s.read_imu().unwrap());
        assert_eq!(s.driver().reads(), 3);
    }

    #[test]
    fn test_invalid_field_keeps_cache() {
        let mut s = session();
        s.driver_mut().sample = FusionData {
            gyro_valid: true,
            gyro: Vector3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };
        assert_eq!(s.get_gyroscope_raw().unwrap(), Vector3::new(1.0, 2.0, 3.0));

        s.driver_mut().sample.gyro_valid = false;
        s.driver_mut().sample.gyro = Vector3::new(9.0, 9.0, 9.0);
        assert_eq!(s.get_gyroscope_raw().unwrap(), Vector3::new(1.0, 2.0, 3.0));

        // Never-valid fields answer with zero
        assert_eq!(s.get_accelerometer_raw().unwrap(), Vector3::ZERO);
        assert_eq!(s.get_orientation_radians().unwrap(), Orientation::ZERO);
    }

    #[test]
    fn test_detect_step_feeds_accelerometer() {
        let mut s = session();
        s.driver_mut().sample = FusionData {
            accel_valid: true,
            accel: Vector3::new(0.0, 0.0, 2.0),
            ..Default::default()
        };
        let mut detector = StepDetector::new(crate::step::Axis::Z, 1.0, 0.3);

        assert!(!s.detect_step(&mut detector).unwrap());
        assert!(!s.detect_step(&mut detector).unwrap());
        assert!(s.detect_step(&mut detector).unwrap());

        // Failed reads replay the cached 2.0 G, which stays above the band
        s.driver_mut().reads = VecDeque::from(vec![false; 9]);
        for _ in 0..3 {
            assert!(!s.detect_step(&mut detector).unwrap());
        }
        assert_eq!(detector.steps(), 1);
        assert!(!detector.is_armed());
    }

    #[test]
    fn test_compass_reader_switches_to_compass_only() {
        let mut s = session();
        s.driver_mut().sample = FusionData {
            fusion_pose_valid: true,
            fusion_pose: Vector3::new(0.0, 0.0, -std::f64::consts::FRAC_PI_2),
            ..Default::default()
        };

        let heading = s.get_compass().unwrap();
        assert!((heading - 270.0).abs() < 1e-9);
        assert_eq!(s.capabilities(), CapabilitySet::COMPASS_ONLY);

        s.get_gyroscope().unwrap();
        assert_eq!(s.capabilities(), CapabilitySet::GYRO_ONLY);
        s.get_accelerometer().unwrap();
        assert_eq!(s.capabilities(), CapabilitySet::ACCEL_ONLY);
    }

    #[test]
    fn test_shared_session_serializes_access() {
        let shared = SharedImuSession::new(session());
        let other = shared.clone();

        let handle = thread::spawn(move || {
            other.with(|s| s.set_imu_config(true, false, false)).unwrap();
        });
        handle.join().unwrap();

        assert_eq!(
            shared.with(|s| s.capabilities()),
            CapabilitySet::COMPASS_ONLY
        );
        assert_eq!(shared.lock().i2c_address(), DEFAULT_I2C_ADDRESS);
    }
}
