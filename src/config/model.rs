// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::rpc::InstanceRef;
use crate::store::RunStoreRef;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [launcher]
/// wait_for_processes = false
/// join_timeout = "30s"
/// initial_poll_interval = "10ms"
/// max_poll_interval = "1s"
/// can_cancel_timeout = "5s"
/// request_timeout = "30s"
///
/// [store]
/// path = ".runlaunch/runs.json"
/// ```
///
/// All sections and keys are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub launcher: LauncherSection,

    #[serde(default)]
    pub store: StoreSection,
}

/// `[launcher]` section. Durations are strings like `"10ms"` or `"30s"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LauncherSection {
    /// Block in `dispose()` until every worker process we spawned has exited.
    #[serde(default)]
    pub wait_for_processes: bool,

    /// Default deadline for `join()`.
    #[serde(default = "default_join_timeout")]
    pub join_timeout: String,

    /// First sleep of the join poll loop; doubled every round.
    #[serde(default = "default_initial_poll_interval")]
    pub initial_poll_interval: String,

    /// Upper bound for a single join poll sleep.
    #[serde(default = "default_max_poll_interval")]
    pub max_poll_interval: String,

    /// Deadline for asking a worker whether a run can be cancelled.
    #[serde(default = "default_can_cancel_timeout")]
    pub can_cancel_timeout: String,

    /// Deadline for every other worker request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_join_timeout() -> String {
    "30s".to_string()
}

fn default_initial_poll_interval() -> String {
    "10ms".to_string()
}

fn default_max_poll_interval() -> String {
    "1s".to_string()
}

fn default_can_cancel_timeout() -> String {
    "5s".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            wait_for_processes: false,
            join_timeout: default_join_timeout(),
            initial_poll_interval: default_initial_poll_interval(),
            max_poll_interval: default_max_poll_interval(),
            can_cancel_timeout: default_can_cancel_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// `[store]` section. Without a `path`, runs are kept in memory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Typed launcher settings, produced by validating a [`LauncherSection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LauncherSettings {
    pub wait_for_processes: bool,
    pub join_timeout: Duration,
    pub initial_poll_interval: Duration,
    pub max_poll_interval: Duration,
    pub can_cancel_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            wait_for_processes: false,
            join_timeout: Duration::from_secs(30),
            initial_poll_interval: Duration::from_millis(10),
            max_poll_interval: Duration::from_secs(1),
            can_cancel_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl LauncherSettings {
    pub fn with_wait_for_processes(mut self, wait: bool) -> Self {
        self.wait_for_processes = wait;
        self
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (or [`Default`]), so
/// holders can rely on the settings being sane.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub launcher: LauncherSettings,
    pub store: StoreSection,
    /// File this configuration was loaded from, if any.
    pub source: Option<PathBuf>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(launcher: LauncherSettings, store: StoreSection) -> Self {
        Self {
            launcher,
            store,
            source: None,
        }
    }

    pub fn run_store_ref(&self) -> RunStoreRef {
        match &self.store.path {
            Some(path) => RunStoreRef::JsonFile { path: path.clone() },
            None => RunStoreRef::InMemory,
        }
    }

    /// Reference handed to workers so they can rebuild a compatible context.
    pub fn instance_ref(&self) -> InstanceRef {
        InstanceRef {
            config_path: self.source.clone(),
            run_store: self.run_store_ref(),
        }
    }
}
