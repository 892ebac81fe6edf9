//! Fusion driver implementations

pub mod mock;

use crate::config::AppConfig;
use crate::driver::FusionDriver;
use crate::error::{Error, Result};
use mock::MockFusionDriver;

/// Create a fusion driver based on configuration
pub fn create_driver(config: &AppConfig) -> Result<Box<dyn FusionDriver>> {
    match config.device.device_type.as_str() {
        "mock" => Ok(Box::new(MockFusionDriver::new(config.mock.clone()))),
        other => Err(Error::Config(format!("unknown device type: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_driver() {
        let config = AppConfig::default();
        let driver = create_driver(&config).unwrap();
        assert_eq!(driver.poll_interval_ms(), config.mock.poll_interval_ms);
    }

    #[test]
    fn test_unknown_device_type() {
        let mut config = AppConfig::default();
        config.device.device_type = "rtimu".to_string();
        assert!(matches!(create_driver(&config), Err(Error::Config(_))));
    }
}
