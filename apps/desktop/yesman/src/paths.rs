//! Where the host keeps its configuration and logs.

use crate::error::YesmanError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "yesman";
pub const ENV_CONFIG_DIR: &str = "YESMAN_CONFIG_DIR";
pub const ENV_LOG_DIR: &str = "YESMAN_LOG_DIR";

/// Directory holding `bridge.toml` and `settings.json`.
///
/// `YESMAN_CONFIG_DIR` wins; otherwise `<platform config dir>/yesman`.
#[track_caller]
pub fn config_dir() -> Result<PathBuf, YesmanError> {
    resolve(
        |key| std::env::var(key).ok(),
        ENV_CONFIG_DIR,
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME)),
    )
}

/// Directory holding `yesman.log`.
///
/// `YESMAN_LOG_DIR` wins; otherwise `<platform local data dir>/yesman/logs`.
#[track_caller]
pub fn log_dir() -> Result<PathBuf, YesmanError> {
    resolve(
        |key| std::env::var(key).ok(),
        ENV_LOG_DIR,
        dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME).join("logs")),
    )
}

/// Pick the override named `key` if set and non-blank, else `fallback`.
#[track_caller]
pub fn resolve<F>(lookup: F, key: &str, fallback: Option<PathBuf>) -> Result<PathBuf, YesmanError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(key).filter(|value| !value.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    fallback.ok_or_else(|| YesmanError::Yesman {
        message: format!("No platform directory available; set {key}"),
        location: ErrorLocation::from(Location::caller()),
    })
}
