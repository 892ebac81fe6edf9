//! Value types for IMU readings and sub-sensor enablement.
//!
//! All readings are `Copy` snapshots: a caller holding one can never reach
//! back into the session cache it came from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-axis reading in sensor-native units
///
/// - Accelerometer: Gs
/// - Gyroscope: rad/s
/// - Magnetometer: µT
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Orientation on the aircraft principal axes
///
/// Unit depends on the accessor it came from: radians from
/// `get_orientation_radians`, degrees in [0, 360) from
/// `get_orientation_degrees`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl Orientation {
    pub const ZERO: Orientation = Orientation {
        pitch: 0.0,
        roll: 0.0,
        yaw: 0.0,
    };

    /// Build from the driver's fusion pose: x is roll, y is pitch, z is yaw.
    pub fn from_fusion_pose(pose: Vector3) -> Self {
        Self {
            roll: pose.x,
            pitch: pose.y,
            yaw: pose.z,
        }
    }

    /// Convert a radian orientation to degrees, each axis normalized to [0, 360)
    pub fn to_degrees(self) -> Self {
        Self {
            pitch: normalize_degrees(self.pitch),
            roll: normalize_degrees(self.roll),
            yaw: normalize_degrees(self.yaw),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pitch={:.2} roll={:.2} yaw={:.2}",
            self.pitch, self.roll, self.yaw
        )
    }
}

/// Convert radians to degrees and fold the result into [0, 360).
///
/// For the fusion engine's (-π, π] range this is "add 360 to negatives,
/// leave the rest". A tiny negative angle can round up to exactly 360.0,
/// which is folded back to 0.0.
pub fn normalize_degrees(radians: f64) -> f64 {
    let deg = radians.to_degrees().rem_euclid(360.0);
    if deg >= 360.0 { 0.0 } else { deg }
}

/// Which sub-sensors feed the fusion engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub compass: bool,
    pub gyro: bool,
    pub accel: bool,
}

impl CapabilitySet {
    /// Everything off (state before the driver is initialized)
    pub const NONE: CapabilitySet = CapabilitySet::new(false, false, false);
    /// Everything on (state right after initialization)
    pub const ALL: CapabilitySet = CapabilitySet::new(true, true, true);
    pub const COMPASS_ONLY: CapabilitySet = CapabilitySet::new(true, false, false);
    pub const GYRO_ONLY: CapabilitySet = CapabilitySet::new(false, true, false);
    pub const ACCEL_ONLY: CapabilitySet = CapabilitySet::new(false, false, true);

    pub const fn new(compass: bool, gyro: bool, accel: bool) -> Self {
        Self {
            compass,
            gyro,
            accel,
        }
    }
}

/// Field of a fusion sample, each with its own validity flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImuField {
    Accel,
    Gyro,
    Compass,
    FusionPose,
}

impl ImuField {
    /// Name of the driver's validity flag for this field
    pub fn valid_key(self) -> &'static str {
        match self {
            ImuField::Accel => "accelValid",
            ImuField::Gyro => "gyroValid",
            ImuField::Compass => "compassValid",
            ImuField::FusionPose => "fusionPoseValid",
        }
    }
}

/// One sample as reported by the fusion driver
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FusionData {
    pub timestamp_us: u64,
    pub accel_valid: bool,
    pub accel: Vector3,
    pub gyro_valid: bool,
    pub gyro: Vector3,
    pub compass_valid: bool,
    pub compass: Vector3,
    pub fusion_pose_valid: bool,
    pub fusion_pose: Vector3,
}

impl FusionData {
    /// Per-field validity flag
    pub fn is_valid(&self, field: ImuField) -> bool {
        match field {
            ImuField::Accel => self.accel_valid,
            ImuField::Gyro => self.gyro_valid,
            ImuField::Compass => self.compass_valid,
            ImuField::FusionPose => self.fusion_pose_valid,
        }
    }

    /// Per-field vector, regardless of validity
    pub fn vector(&self, field: ImuField) -> Vector3 {
        match field {
            ImuField::Accel => self.accel,
            ImuField::Gyro => self.gyro,
            ImuField::Compass => self.compass,
            ImuField::FusionPose => self.fusion_pose,
        }
    }
}

/// Dynamically typed enable flag, as decoded from configuration or a command
///
/// Only `Bool` is accepted by the capability update; everything else is
/// rejected before the driver is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FlagValue::Bool(_) => "bool",
            FlagValue::Int(_) => "int",
            FlagValue::Float(_) => "float",
            FlagValue::Text(_) => "string",
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        FlagValue::Bool(b)
    }
}
