//! Simulated fusion driver configuration
//!
//! Every field has a default, so an empty `[mock]` table (or none at all)
//! gives a well-behaved IMU sitting roughly level and turning slowly.

use serde::{Deserialize, Serialize};

/// Simulation parameters for [`super::MockFusionDriver`]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MockConfig {
    /// Poll interval reported after init (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,

    /// Make `init` fail (no IMU on the bus)
    #[serde(default)]
    pub fail_init: bool,

    /// Probability that a single read attempt reports no sample
    #[serde(default)]
    pub read_failure_rate: f64,

    /// Samples after init during which compass and fusion pose are not valid
    #[serde(default)]
    pub warmup_samples: u32,

    /// Simulated heading rate (rad/s)
    #[serde(default = "default_yaw_rate")]
    pub yaw_rate: f64,

    /// Amplitude of the simulated roll/pitch sway (rad)
    #[serde(default = "default_sway_amplitude")]
    pub sway_amplitude: f64,

    /// Sway period (s)
    #[serde(default = "default_sway_period")]
    pub sway_period: f64,

    /// Accelerometer noise stddev (G)
    #[serde(default = "default_accel_stddev")]
    pub accel_stddev: f64,

    /// Gyroscope noise stddev (rad/s)
    #[serde(default = "default_gyro_stddev")]
    pub gyro_stddev: f64,

    /// Magnetometer noise stddev (µT)
    #[serde(default = "default_compass_stddev")]
    pub compass_stddev: f64,

    /// Walking cadence added to the vertical acceleration (Hz, 0 = standing)
    #[serde(default)]
    pub step_rate: f64,

    /// Vertical acceleration swing per step (G)
    #[serde(default = "default_step_amplitude")]
    pub step_amplitude: f64,

    /// Gyro-only fusion drift in yaw (rad/s)
    #[serde(default = "default_gyro_drift")]
    pub gyro_drift: f64,

    /// Random seed (0 = entropy)
    #[serde(default)]
    pub random_seed: u64,
}

fn default_poll_interval_ms() -> u32 {
    4 // ~250 Hz fusion rate
}

fn default_yaw_rate() -> f64 {
    0.1
}

fn default_sway_amplitude() -> f64 {
    0.05
}

fn default_sway_period() -> f64 {
    4.0
}

fn default_step_amplitude() -> f64 {
    0.5
}

fn default_accel_stddev() -> f64 {
    0.01
}

fn default_gyro_stddev() -> f64 {
    0.005
}

fn default_compass_stddev() -> f64 {
    0.5
}

fn default_gyro_drift() -> f64 {
    0.002
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            fail_init: false,
            read_failure_rate: 0.0,
            warmup_samples: 0,
            yaw_rate: default_yaw_rate(),
            sway_amplitude: default_sway_amplitude(),
            sway_period: default_sway_period(),
            step_rate: 0.0,
            step_amplitude: default_step_amplitude(),
            accel_stddev: default_accel_stddev(),
            gyro_stddev: default_gyro_stddev(),
            compass_stddev: default_compass_stddev(),
            gyro_drift: default_gyro_drift(),
            random_seed: 0,
        }
    }
}

impl MockConfig {
    /// Noise-free, deterministic configuration
    pub fn ideal() -> Self {
        Self {
            accel_stddev: 0.0,
            gyro_stddev: 0.0,
            compass_stddev: 0.0,
            gyro_drift: 0.0,
            random_seed: 1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_uses_defaults() {
        let config: MockConfig = toml::from_str("").unwrap();
        assert_eq!(config, MockConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config: MockConfig =
            toml::from_str("poll_interval_ms = 10\nread_failure_rate = 0.5").unwrap();
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.read_failure_rate, 0.5);
        assert_eq!(config.yaw_rate, default_yaw_rate());
        assert_eq!(config.step_rate, 0.0);
    }
}
