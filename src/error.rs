//! Error types for the IMU session

use std::path::PathBuf;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// IMU session error types
///
/// Only construction and configuration problems surface here. Failed sample
/// reads are absorbed by the session and answered from its cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No I2C bus device node visible on the host
    #[error("Cannot access I2C: no i2c device under {0}. Please ensure I2C is enabled")]
    NoI2cBus(PathBuf),

    /// Driver initialization failed (not retried)
    #[error("IMU init failed: {0}")]
    InitFailed(String),

    /// Invalid parameter (non-boolean enable flag, bad value)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
