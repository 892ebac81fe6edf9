//! IMU driver settings file
//!
//! The fusion driver reads an ini-style `<name>.ini` file. A per-user copy
//! lives under `~/.config/sense_hat/`; on first use it is seeded from the
//! system-wide template in `/etc/`. The session rewrites the
//! `I2CSlaveAddress` line of the per-user copy so the driver talks to the
//! requested address.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-user settings directory, relative to `$HOME`
pub const SETTINGS_HOME_PATH: &str = ".config/sense_hat";

/// Directory holding the system-wide template
pub const SYSTEM_SETTINGS_DIR: &str = "/etc";

/// Default settings file stem
pub const DEFAULT_SETTINGS_NAME: &str = "RTIMULib";

/// Settings key holding the IMU bus address
pub const I2C_ADDRESS_KEY: &str = "I2CSlaveAddress";

/// Where the settings file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsLocation {
    /// Per-user settings directory (created if missing)
    pub home_dir: PathBuf,
    /// Directory holding the system-wide template
    pub system_dir: PathBuf,
    /// File stem; `.ini` is appended
    pub name: String,
}

impl SettingsLocation {
    pub fn new(
        home_dir: impl Into<PathBuf>,
        system_dir: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            home_dir: home_dir.into(),
            system_dir: system_dir.into(),
            name: name.into(),
        }
    }

    /// Default location for the current user: `$HOME/.config/sense_hat` and `/etc`
    pub fn for_user(name: &str) -> Result<Self> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("HOME is not set".to_string()))?;
        Ok(Self::new(
            PathBuf::from(home).join(SETTINGS_HOME_PATH),
            SYSTEM_SETTINGS_DIR,
            name,
        ))
    }

    pub fn file_name(&self) -> String {
        format!("{}.ini", self.name)
    }

    pub fn home_file(&self) -> PathBuf {
        self.home_dir.join(self.file_name())
    }

    pub fn system_file(&self) -> PathBuf {
        self.system_dir.join(self.file_name())
    }

    /// Make sure the per-user directory exists and seed the per-user file
    /// from the system template if only the template exists.
    ///
    /// Returns the per-user file path. The file itself may still be missing
    /// when there was no template either.
    pub fn resolve(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.home_dir)?;

        let home_file = self.home_file();
        let system_file = self.system_file();

        if system_file.is_file() && !home_file.is_file() {
            fs::copy(&system_file, &home_file)?;
            log::info!(
                "Seeded IMU settings {} from {}",
                home_file.display(),
                system_file.display()
            );
        }

        Ok(home_file)
    }
}

/// Rewrite every line containing `I2CSlaveAddress` to the given address.
///
/// All other lines are written back byte-for-byte. The address is written in
/// decimal, which is what the driver's ini parser expects.
pub fn patch_i2c_address(path: &Path, address: u8) -> Result<()> {
    let contents = fs::read_to_string(path)?;
    let patched = replace_i2c_address(&contents, address);
    fs::write(path, patched)?;
    log::debug!("Set {}={} in {}", I2C_ADDRESS_KEY, address, path.display());
    Ok(())
}

fn replace_i2c_address(contents: &str, address: u8) -> String {
    let mut out = String::with_capacity(contents.len());
    for line in contents.split_inclusive('\n') {
        if line.contains(I2C_ADDRESS_KEY) {
            out.push_str(&format!("{}={}\n", I2C_ADDRESS_KEY, address));
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Parsed driver settings
///
/// Keeps `key=value` pairs in file order. Section headers, comments and
/// blank lines are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImuSettings {
    path: Option<PathBuf>,
    entries: Vec<(String, String)>,
}

impl ImuSettings {
    /// Load from an ini file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut settings = Self::parse(&contents);
        settings.path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Parse ini text
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';'))
            .filter(|l| !l.starts_with('['))
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        Self {
            path: None,
            entries,
        }
    }

    /// File the settings were loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw value of the last occurrence of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse the value of `key`
    ///
    /// Missing keys give `Ok(None)`; unparsable values are a config error.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| Error::Config(format!("invalid value for {}: {:?}", key, raw))),
        }
    }

    /// Configured IMU bus address
    pub fn i2c_slave_address(&self) -> Result<Option<u8>> {
        self.get_parsed(I2C_ADDRESS_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "# RTIMULib settings\r\nIMUType=6\nI2CBus=1\nI2CSlaveAddress=212\n\n[fusion]\nFusionType=2\n";

    fn location(root: &TempDir) -> SettingsLocation {
        SettingsLocation::new(
            root.path().join("home/.config/sense_hat"),
            root.path().join("etc"),
            DEFAULT_SETTINGS_NAME,
        )
    }

    #[test]
    fn test_resolve_seeds_from_template() {
        let root = TempDir::new().unwrap();
        let loc = location(&root);
        fs::create_dir_all(&loc.system_dir).unwrap();
        fs::write(loc.system_file(), TEMPLATE).unwrap();

        let path = loc.resolve().unwrap();
        assert_eq!(path, loc.home_file());
        assert_eq!(fs::read_to_string(&path).unwrap(), TEMPLATE);
    }

    #[test]
    fn test_resolve_keeps_existing_home_file() {
        let root = TempDir::new().unwrap();
        let loc = location(&root);
        fs::create_dir_all(&loc.system_dir).unwrap();
        fs::create_dir_all(&loc.home_dir).unwrap();
        fs::write(loc.system_file(), TEMPLATE).unwrap();
        fs::write(loc.home_file(), "I2CSlaveAddress=106\n").unwrap();

        loc.resolve().unwrap();
        assert_eq!(
            fs::read_to_string(loc.home_file()).unwrap(),
            "I2CSlaveAddress=106\n"
        );
    }

    #[test]
    fn test_resolve_without_template_creates_dir_only() {
        let root = TempDir::new().unwrap();
        let loc = location(&root);

        let path = loc.resolve().unwrap();
        assert!(loc.home_dir.is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_replace_only_touches_address_line() {
        let patched = replace_i2c_address(TEMPLATE, 0x6A);
        let expected = "# RTIMULib settings\r\nIMUType=6\nI2CBus=1\nI2CSlaveAddress=106\n\n[fusion]\nFusionType=2\n";
        assert_eq!(patched, expected);
    }

    #[test]
    fn test_replace_without_trailing_newline() {
        assert_eq!(
            replace_i2c_address("A=1\nI2CSlaveAddress=1", 107),
            "A=1\nI2CSlaveAddress=107\n"
        );
        assert_eq!(replace_i2c_address("", 107), "");
    }

    #[test]
    fn test_patch_missing_file_is_io_error() {
        let root = TempDir::new().unwrap();
        let err = patch_i2c_address(&root.path().join("missing.ini"), 0x6A).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_parse_settings() {
        let settings = ImuSettings::parse(TEMPLATE);
        assert_eq!(settings.len(), 4);
        assert_eq!(settings.get("IMUType"), Some("6"));
        assert_eq!(settings.get("FusionType"), Some("2"));
        assert_eq!(settings.i2c_slave_address().unwrap(), Some(212));
        assert_eq!(settings.get("Missing"), None);
    }

    #[test]
    fn test_parse_invalid_value() {
        let settings = ImuSettings::parse("I2CSlaveAddress=0x6a\n");
        assert!(matches!(
            settings.i2c_slave_address(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_records_path() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("RTIMULib.ini");
        fs::write(&path, "I2CSlaveAddress=106\n").unwrap();

        let settings = ImuSettings::load(&path).unwrap();
        assert_eq!(settings.path(), Some(path.as_path()));
        assert_eq!(settings.i2c_slave_address().unwrap(), Some(106));
    }
}
