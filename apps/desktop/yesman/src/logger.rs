//! Host logging: colored stdout plus a plain `yesman.log`.
//!
//! Initialization runs at most once per process. Records coming from the
//! WebSocket stack are capped at `Warn` so frame-level chatter does not bury
//! bridge and face events.

use crate::error::YesmanError;

use common::ErrorLocation;

use std::fmt::Arguments;
use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339_millis;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "yesman.log";

/// Overrides the build-dependent default level (`trace`, `debug`, `info`, ...).
pub const ENV_LOG_LEVEL: &str = "YESMAN_LOG_LEVEL";

#[cfg(debug_assertions)]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

const NOISY_TARGETS: [&str; 2] = ["tungstenite", "tokio_tungstenite"];

/// Parse a level name, falling back to the build default.
pub fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(DEFAULT_LEVEL)
}

/// Initialize the logger with dual output (stdout + file).
///
/// Safe to call more than once: later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns [`YesmanError::Yesman`] if the log file cannot be created or a
/// global logger is already installed.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), YesmanError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir, level);
        if result.is_ok() {
            info!(
                "Logger initialized with level {:?}, writing {}",
                level,
                log_dir.join(LOG_FILE_NAME).display()
            );
        }
    });

    result
}

#[track_caller]
fn initialize_internal(log_dir: &Path, level: LevelFilter) -> Result<(), YesmanError> {
    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let log_file = fern::log_file(log_dir.join(LOG_FILE_NAME)).map_err(|e| YesmanError::Yesman {
        message: format!("Failed to create log file in {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let mut base = Dispatch::new().level(level);
    for target in NOISY_TARGETS {
        base = base.level_for(target, level.min(LevelFilter::Warn));
    }

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            write_line(out, colors.color(record.level()), message, record)
        })
        .chain(stdout());

    let file_dispatch = Dispatch::new()
        .format(|out, message, record| write_line(out, record.level(), message, record))
        .chain(log_file);

    base.chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| YesmanError::Yesman {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}

fn write_line(
    out: FormatCallback<'_>,
    level: impl std::fmt::Display,
    message: &Arguments<'_>,
    record: &Record<'_>,
) {
    out.finish(format_args!(
        "[{date} - {level}] {target}: {message} [{file}:{line}]",
        date = format_rfc3339_millis(SystemTime::now()),
        target = record.target(),
        file = record.file().unwrap_or("unknown"),
        line = record.line().unwrap_or(0),
    ))
}
