//! sensehat-imu - polling session around a sensor-fusion IMU driver
//!
//! Wraps an accelerometer/gyroscope/magnetometer chip and its fusion engine
//! behind a small blocking API:
//!
//! - lazy, one-time driver initialization
//! - sub-sensor enable/disable forwarded only on change
//! - bounded-retry reads with last-known-good fallback
//! - fusion pose remapped to pitch/roll/yaw, in radians or [0, 360) degrees
//! - step counting on one accelerometer axis
//!
//! ```no_run
//! use sensehat_imu::devices::mock::MockFusionDriver;
//! use sensehat_imu::{ImuSession, SettingsLocation};
//! use std::path::Path;
//!
//! let location = SettingsLocation::for_user("RTIMULib")?;
//! let mut sense = ImuSession::new(
//!     MockFusionDriver::default(),
//!     0x6A,
//!     &location,
//!     Path::new("/dev"),
//! )?;
//! let orientation = sense.get_orientation_degrees()?;
//! println!("{}", orientation);
//! # Ok::<(), sensehat_imu::Error>(())
//! ```

pub mod bus;
pub mod config;
pub mod devices;
pub mod driver;
pub mod error;
pub mod session;
pub mod settings;
pub mod step;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use driver::FusionDriver;
pub use error::{Error, Result};
pub use session::{ImuSession, InitState, SharedImuSession};
pub use settings::{ImuSettings, SettingsLocation};
pub use step::{Axis, StepDetector};
pub use types::{CapabilitySet, FlagValue, FusionData, ImuField, Orientation, Vector3};
