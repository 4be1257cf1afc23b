use std::env;
use std::time::Duration;

use crate::drive::DriveConfig;
use crate::drive::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};
use crate::error::{Error, Result};

pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_ROOT_FOLDER_ID: &str = "GOOGLE_DRIVE_ROOT_FOLDER_ID";
pub const ENV_SUPPORTS_ALL_DRIVES: &str = "GOOGLE_DRIVE_SUPPORTS_ALL_DRIVES";
pub const ENV_MAX_RETRIES: &str = "GOOGLE_DRIVE_MAX_RETRIES";
pub const ENV_RETRY_DELAY_MS: &str = "GOOGLE_DRIVE_RETRY_DELAY_MS";

/// Load drive configuration from process environment variables.
///
/// Callers constructing [`DriveConfig`] directly bypass the environment
/// entirely; this loader is the only place that reads it.
pub fn load_drive_config() -> Result<DriveConfig> {
    resolve_drive_config(|key| env::var(key).ok())
}

/// Resolve configuration from an arbitrary variable source. Pure function
/// so tests do not have to mutate process state.
pub fn resolve_drive_config<F>(lookup: F) -> Result<DriveConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let credentials_path = lookup(ENV_CREDENTIALS)
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingCredentials)?;

    let mut config = DriveConfig::new(credentials_path);
    config.root_folder_id = lookup(ENV_ROOT_FOLDER_ID).filter(|value| !value.is_empty());
    config.supports_all_drives = lookup(ENV_SUPPORTS_ALL_DRIVES)
        .map(|value| parse_flag(&value))
        .unwrap_or(false);

    config.max_retries = match lookup(ENV_MAX_RETRIES) {
        Some(value) => parse_retry_bound(&value)?,
        None => DEFAULT_MAX_RETRIES,
    };
    config.retry_delay = match lookup(ENV_RETRY_DELAY_MS) {
        Some(value) => Duration::from_millis(parse_number(ENV_RETRY_DELAY_MS, &value)?),
        None => Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
    };

    Ok(config)
}

// Accepted truthy forms are "true" and "1"; everything else is false.
fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1")
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| Error::InvalidConfigValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_retry_bound(value: &str) -> Result<u32> {
    let bound: u32 = value.parse().map_err(|_| Error::InvalidRetryBound {
        value: value.to_string(),
    })?;
    if bound < 1 {
        return Err(Error::InvalidRetryBound {
            value: value.to_string(),
        });
    }
    Ok(bound)
}
