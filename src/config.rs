//! Configuration for the `imu-monitor` application
//!
//! Loaded from a TOML file. Every section and key has a default, so an empty
//! file runs the simulated IMU with the standard settings location.

use crate::bus::DEFAULT_BUS_DIR;
use crate::devices::mock::MockConfig;
use crate::error::Result;
use crate::session::DEFAULT_I2C_ADDRESS;
use crate::settings::{DEFAULT_SETTINGS_NAME, SYSTEM_SETTINGS_DIR, SettingsLocation};
use crate::step::{Axis, StepDetector};
use crate::types::FlagValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub imu: ImuConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub steps: StepConfig,
    #[serde(default)]
    pub mock: MockConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which fusion driver to use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Driver type (`mock`)
    #[serde(default = "default_device_type")]
    pub device_type: String,
}

fn default_device_type() -> String {
    "mock".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
        }
    }
}

/// IMU session parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImuConfig {
    /// IMU bus address, written into the settings file
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,

    /// Settings file stem (`.ini` is appended)
    #[serde(default = "default_settings_file")]
    pub settings_file: String,

    /// Directory searched for `i2c*` device nodes
    #[serde(default = "default_bus_dir")]
    pub bus_dir: PathBuf,

    /// Per-user settings directory (default `$HOME/.config/sense_hat`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_dir: Option<PathBuf>,

    /// System template directory (default `/etc`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_dir: Option<PathBuf>,

    /// Fusion inputs applied at startup
    #[serde(default)]
    pub enable: EnableConfig,
}

fn default_i2c_address() -> u8 {
    DEFAULT_I2C_ADDRESS
}

fn default_settings_file() -> String {
    DEFAULT_SETTINGS_NAME.to_string()
}

fn default_bus_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUS_DIR)
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            i2c_address: default_i2c_address(),
            settings_file: default_settings_file(),
            bus_dir: default_bus_dir(),
            settings_dir: None,
            system_dir: None,
            enable: EnableConfig::default(),
        }
    }
}

impl ImuConfig {
    /// Settings file location, falling back to the per-user default
    pub fn settings_location(&self) -> Result<SettingsLocation> {
        let mut location = match &self.settings_dir {
            Some(dir) => SettingsLocation::new(dir, SYSTEM_SETTINGS_DIR, &self.settings_file),
            None => SettingsLocation::for_user(&self.settings_file)?,
        };
        if let Some(system_dir) = &self.system_dir {
            location.system_dir = system_dir.clone();
        }
        Ok(location)
    }
}

/// Startup fusion inputs
///
/// Kept dynamically typed so a non-boolean value in the file is reported
/// by the session's type check rather than swallowed by the parser.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnableConfig {
    #[serde(default = "flag_true")]
    pub compass: FlagValue,
    #[serde(default = "flag_true")]
    pub gyro: FlagValue,
    #[serde(default = "flag_true")]
    pub accel: FlagValue,
}

fn flag_true() -> FlagValue {
    FlagValue::Bool(true)
}

impl Default for EnableConfig {
    fn default() -> Self {
        Self {
            compass: flag_true(),
            gyro: flag_true(),
            accel: flag_true(),
        }
    }
}

/// What the monitor loop prints each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleMode {
    /// Orientation plus all raw vectors
    #[default]
    All,
    /// Raw accelerometer only
    Accel,
    /// Orientation in degrees only
    Orientation,
    /// Compass heading (switches fusion to compass only)
    Compass,
    /// Step count from the accelerometer
    Steps,
}

/// Polling loop parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// Delay between loop iterations (ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default)]
    pub mode: SampleMode,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            mode: SampleMode::default(),
        }
    }
}

/// Step detection parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepConfig {
    /// Accelerometer axis to watch
    #[serde(default)]
    pub axis: Axis,

    /// Centre of the hysteresis band (G)
    #[serde(default = "default_step_threshold")]
    pub threshold: f64,

    /// Half-width of the hysteresis band (G)
    #[serde(default = "default_step_delta")]
    pub delta: f64,
}

fn default_step_threshold() -> f64 {
    1.0
}

fn default_step_delta() -> f64 {
    0.3
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            axis: Axis::default(),
            threshold: default_step_threshold(),
            delta: default_step_delta(),
        }
    }
}

impl StepConfig {
    pub fn detector(&self) -> StepDetector {
        StepDetector::new(self.axis, self.threshold, self.delta)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
