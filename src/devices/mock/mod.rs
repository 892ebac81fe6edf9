//! Simulated sensor-fusion driver
//!
//! Stands in for the physical IMU so the session and the monitor binary can
//! run without hardware. The simulated board turns at a constant heading
//! rate while rolling and pitching in a small sway.
//!
//! # Fusion inputs
//!
//! The fusion pose reacts to the enabled sub-sensors the way a real
//! complementary filter would:
//!
//! | Enabled | roll / pitch | yaw |
//! |---------|--------------|-----|
//! | accel or gyro | tracked | - |
//! | compass | - | tracked |
//! | gyro without compass | - | tracked with drift |
//! | nothing | pose not valid | pose not valid |
//!
//! Untracked axes read 0.
//!
//! A non-zero `step_rate` adds a sinusoidal walking bounce to the vertical
//! acceleration.
//!
//! # Instrumentation
//!
//! [`MockStats`] counts init calls, enable/disable writes and read attempts.
//! Keep a handle from [`MockFusionDriver::stats`] before boxing the driver.

pub mod config;
mod noise;

use crate::driver::FusionDriver;
use crate::error::{Error, Result};
use crate::settings::ImuSettings;
use crate::types::{CapabilitySet, FusionData, Vector3};

pub use config::MockConfig;
use noise::NoiseGenerator;

use std::f64::consts::{PI, TAU};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Horizontal component of the simulated Earth field (µT)
const FIELD_HORIZONTAL_UT: f64 = 20.0;
/// Vertical component of the simulated Earth field (µT, pointing down)
const FIELD_VERTICAL_UT: f64 = -40.0;

/// Call counters, shared with whoever holds a handle
#[derive(Debug, Default)]
pub struct MockStats {
    pub init_calls: AtomicU64,
    pub compass_writes: AtomicU64,
    pub gyro_writes: AtomicU64,
    pub accel_writes: AtomicU64,
    pub read_attempts: AtomicU64,
    pub failed_reads: AtomicU64,
}

impl MockStats {
    /// Total enable/disable writes across all three sub-sensors
    pub fn total_writes(&self) -> u64 {
        self.compass_writes.load(Ordering::Relaxed)
            + self.gyro_writes.load(Ordering::Relaxed)
            + self.accel_writes.load(Ordering::Relaxed)
    }
}

/// Simulated fusion driver
pub struct MockFusionDriver {
    config: MockConfig,
    noise: NoiseGenerator,
    stats: Arc<MockStats>,
    initialized: bool,
    enabled: CapabilitySet,
    /// Successful samples since init
    samples: u64,
    configured_address: Option<u8>,
    data: FusionData,
}

impl MockFusionDriver {
    pub fn new(config: MockConfig) -> Self {
        let noise = NoiseGenerator::new(config.random_seed);
        Self {
            config,
            noise,
            stats: Arc::new(MockStats::default()),
            initialized: false,
            enabled: CapabilitySet::NONE,
            samples: 0,
            configured_address: None,
            data: FusionData::default(),
        }
    }

    /// Shared call counters
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    /// Sub-sensors the simulated fusion engine currently uses
    pub fn enabled(&self) -> CapabilitySet {
        self.enabled
    }

    /// Bus address taken from the settings file
    pub fn configured_address(&self) -> Option<u8> {
        self.configured_address
    }

    /// Simulated time of the current sample (s)
    fn sample_time(&self) -> f64 {
        self.samples as f64 * f64::from(self.config.poll_interval_ms.max(1)) * 0.001
    }

    fn simulate(&mut self) {
        let t = self.sample_time();
        let phase = TAU * t / self.config.sway_period.max(f64::EPSILON);
        let sway_rate = self.config.sway_amplitude * TAU / self.config.sway_period.max(f64::EPSILON);

        let roll = self.config.sway_amplitude * phase.sin();
        let pitch = self.config.sway_amplitude * phase.cos();
        let yaw = wrap_angle(self.config.yaw_rate * t);

        let bounce = if self.config.step_rate > 0.0 {
            self.config.step_amplitude * (TAU * self.config.step_rate * t).sin()
        } else {
            0.0
        };

        // Gravity seen by the sensor plus the walking bounce, in G
        let accel = Vector3::new(
            -pitch.sin(),
            roll.sin() * pitch.cos(),
            roll.cos() * pitch.cos() + bounce,
        );
        let gyro = Vector3::new(
            sway_rate * phase.cos(),
            -sway_rate * phase.sin(),
            self.config.yaw_rate,
        );
        let compass = Vector3::new(
            FIELD_HORIZONTAL_UT * yaw.cos(),
            -FIELD_HORIZONTAL_UT * yaw.sin(),
            FIELD_VERTICAL_UT,
        );

        let warmed_up = self.samples > u64::from(self.config.warmup_samples);
        let tilt_tracked = self.enabled.accel || self.enabled.gyro;
        let fused_yaw = if self.enabled.compass {
            yaw
        } else if self.enabled.gyro {
            wrap_angle(yaw + self.config.gyro_drift * t)
        } else {
            0.0
        };

        let fusion_pose = Vector3::new(
            if tilt_tracked { roll } else { 0.0 },
            if tilt_tracked { pitch } else { 0.0 },
            fused_yaw,
        );

        self.data = FusionData {
            timestamp_us: (t * 1e6) as u64,
            accel_valid: true,
            accel: self.noise.jitter(accel, self.config.accel_stddev),
            gyro_valid: true,
            gyro: self.noise.jitter(gyro, self.config.gyro_stddev),
            compass_valid: warmed_up,
            compass: self.noise.jitter(compass, self.config.compass_stddev),
            fusion_pose_valid: warmed_up && self.enabled != CapabilitySet::NONE,
            fusion_pose,
        };
    }
}

impl Default for MockFusionDriver {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl FusionDriver for MockFusionDriver {
    fn configure(&mut self, settings: &ImuSettings) -> Result<()> {
        self.configured_address = settings.i2c_slave_address()?;
        log::debug!(
            "Mock IMU configured ({} settings, address {:?})",
            settings.len(),
            self.configured_address
        );
        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        self.stats.init_calls.fetch_add(1, Ordering::Relaxed);
        if self.config.fail_init {
            return Err(Error::InitFailed("no IMU detected on the bus".to_string()));
        }
        self.initialized = true;
        self.samples = 0;
        log::info!("Mock IMU initialized");
        Ok(())
    }

    fn poll_interval_ms(&self) -> u32 {
        self.config.poll_interval_ms
    }

    fn set_compass_enabled(&mut self, enabled: bool) {
        self.stats.compass_writes.fetch_add(1, Ordering::Relaxed);
        self.enabled.compass = enabled;
    }

    fn set_gyro_enabled(&mut self, enabled: bool) {
        self.stats.gyro_writes.fetch_add(1, Ordering::Relaxed);
        self.enabled.gyro = enabled;
    }

    fn set_accel_enabled(&mut self, enabled: bool) {
        self.stats.accel_writes.fetch_add(1, Ordering::Relaxed);
        self.enabled.accel = enabled;
    }

    fn read(&mut self) -> bool {
        self.stats.read_attempts.fetch_add(1, Ordering::Relaxed);
        if !self.initialized || self.noise.chance(self.config.read_failure_rate) {
            self.stats.failed_reads.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.samples += 1;
        self.simulate();
        true
    }

    fn data(&self) -> FusionData {
        self.data
    }
}

/// Wrap an angle into (-π, π]
fn wrap_angle(a: f64) -> f64 {
    let w = (a + PI).rem_euclid(TAU) - PI;
    if w <= -PI { w + TAU } else { w }
}
