//! imu-monitor - print IMU readings at a fixed interval
//!
//! Usage:
//! - `imu-monitor <path>`
//! - `imu-monitor --config <path>` / `imu-monitor -c <path>`
//!
//! Defaults to `/etc/imu-monitor.toml`, or built-in defaults when that file
//! does not exist.

use sensehat_imu::config::{AppConfig, SampleMode};
use sensehat_imu::devices::create_driver;
use sensehat_imu::driver::FusionDriver;
use sensehat_imu::error::{Error, Result};
use sensehat_imu::session::ImuSession;
use sensehat_imu::step::StepDetector;
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "/etc/imu-monitor.toml";

/// Parse config path from command line arguments.
///
/// Returns `None` when no path was given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn load_config() -> Result<AppConfig> {
    match parse_config_path() {
        Some(path) => AppConfig::from_file(&path),
        None if Path::new(DEFAULT_CONFIG_PATH).is_file() => AppConfig::from_file(DEFAULT_CONFIG_PATH),
        None => Ok(AppConfig::default()),
    }
}

fn print_sample<D: FusionDriver>(
    session: &mut ImuSession<D>,
    mode: SampleMode,
    detector: &mut StepDetector,
) -> Result<()> {
    match mode {
        SampleMode::All => {
            log::info!("Orientation (deg): {}", session.get_orientation_degrees()?);
            log::info!("Accelerometer (G): {}", session.get_accelerometer_raw()?);
            log::info!("Gyroscope (rad/s): {}", session.get_gyroscope_raw()?);
            log::info!("Magnetometer (uT): {}", session.get_compass_raw()?);
        }
        SampleMode::Accel => {
            log::info!("Accelerometer (G): {}", session.get_accelerometer_raw()?);
        }
        SampleMode::Orientation => {
            log::info!("Orientation (deg): {}", session.get_orientation_degrees()?);
        }
        SampleMode::Compass => {
            log::info!("Heading (deg): {:.2}", session.get_compass()?);
        }
        SampleMode::Steps => {
            if session.detect_step(detector)? {
                log::info!("Step {}", detector.steps());
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = load_config()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("imu-monitor v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Device: {}", config.device.device_type);

    let driver = create_driver(&config)?;
    let location = config.imu.settings_location()?;
    let mut session = ImuSession::new(
        driver,
        config.imu.i2c_address,
        &location,
        &config.imu.bus_dir,
    )?;

    let enable = &config.imu.enable;
    session.set_imu_config_values(&enable.compass, &enable.gyro, &enable.accel)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let interval = Duration::from_millis(config.sampling.interval_ms);
    log::info!(
        "Sampling {:?} every {:?}. Press Ctrl-C to stop.",
        config.sampling.mode,
        interval
    );

    let mut detector = config.steps.detector();
    if config.sampling.mode == SampleMode::Steps {
        log::info!(
            "Step detection on {:?} axis (threshold {:.2} G, delta {:.2} G)",
            config.steps.axis,
            config.steps.threshold,
            config.steps.delta
        );
    }

    while running.load(Ordering::Relaxed) {
        print_sample(&mut session, config.sampling.mode, &mut detector)?;
        thread::sleep(interval);
    }

    if config.sampling.mode == SampleMode::Steps {
        log::info!("Total steps: {}", detector.steps());
    }
    log::info!("imu-monitor stopped");
    Ok(())
}
