// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, LauncherSection, LauncherSettings, RawConfigFile};
use crate::errors::{LaunchError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LaunchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let launcher = validate_launcher(&raw.launcher)?;
        validate_store(&raw)?;
        Ok(ConfigFile::new_unchecked(launcher, raw.store))
    }
}

fn validate_launcher(section: &LauncherSection) -> Result<LauncherSettings> {
    let settings = LauncherSettings {
        wait_for_processes: section.wait_for_processes,
        join_timeout: duration_field("join_timeout", &section.join_timeout)?,
        initial_poll_interval: duration_field(
            "initial_poll_interval",
            &section.initial_poll_interval,
        )?,
        max_poll_interval: duration_field("max_poll_interval", &section.max_poll_interval)?,
        can_cancel_timeout: duration_field("can_cancel_timeout", &section.can_cancel_timeout)?,
        request_timeout: duration_field("request_timeout", &section.request_timeout)?,
    };

    if settings.initial_poll_interval > settings.max_poll_interval {
        return Err(LaunchError::ConfigError(format!(
            "[launcher].initial_poll_interval ({:?}) must not exceed max_poll_interval ({:?})",
            settings.initial_poll_interval, settings.max_poll_interval
        )));
    }

    Ok(settings)
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    let duration = parse_duration(value)
        .map_err(|e| LaunchError::ConfigError(format!("[launcher].{name}: {e}")))?;

    if duration.is_zero() {
        return Err(LaunchError::ConfigError(format!(
            "[launcher].{name} must be greater than zero (got \"{value}\")"
        )));
    }

    Ok(duration)
}

fn validate_store(cfg: &RawConfigFile) -> Result<()> {
    if let Some(path) = &cfg.store.path {
        if path.as_os_str().is_empty() {
            return Err(LaunchError::ConfigError(
                "[store].path must not be empty; omit it to keep runs in memory".to_string(),
            ));
        }
    }
    Ok(())
}
