//! Host I2C bus precondition check

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding I2C device nodes on Linux
pub const DEFAULT_BUS_DIR: &str = "/dev";

/// List `i2c*` device nodes under `dev_dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn find_i2c_buses(dev_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dev_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut buses = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with("i2c") {
            buses.push(entry.path());
        }
    }
    buses.sort();
    Ok(buses)
}

/// Fail with [`Error::NoI2cBus`] unless at least one I2C bus is visible
pub fn ensure_i2c_bus(dev_dir: &Path) -> Result<()> {
    let buses = find_i2c_buses(dev_dir)?;
    if buses.is_empty() {
        return Err(Error::NoI2cBus(dev_dir.to_path_buf()));
    }
    log::debug!("Found I2C buses: {:?}", buses);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_bus_in_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(find_i2c_buses(dir.path()).unwrap().is_empty());
        assert!(matches!(
            ensure_i2c_bus(dir.path()),
            Err(Error::NoI2cBus(_))
        ));
    }

    #[test]
    fn test_missing_dir_has_no_bus() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(ensure_i2c_bus(&missing), Err(Error::NoI2cBus(_))));
    }

    #[test]
    fn test_finds_only_i2c_nodes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("i2c-1"), b"").unwrap();
        fs::write(dir.path().join("i2c-0"), b"").unwrap();
        fs::write(dir.path().join("ttyS0"), b"").unwrap();

        let buses = find_i2c_buses(dir.path()).unwrap();
        assert_eq!(
            buses,
            vec![dir.path().join("i2c-0"), dir.path().join("i2c-1")]
        );
        assert!(ensure_i2c_bus(dir.path()).is_ok());
    }
}
