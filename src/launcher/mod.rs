// src/launcher/mod.rs

//! The run launcher: starts runs on remote workers, tracks what it started,
//! cancels runs on request and waits for everything to finish at shutdown.
//!
//! The operations are split by concern:
//! - [`dispatch`]: `launch`.
//! - [`cancel`]: `can_terminate` / `terminate`.
//! - [`join`]: `join` / `dispose`.
//! - [`registry`]: the shared set of launched run ids.
//!
//! Every operation runs on the caller's task; the only state shared between
//! concurrent callers is the registry. Run status is never cached here, it is
//! always re-read from the run store.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::info;

use crate::config::{ConfigFile, LauncherSettings};
use crate::errors::{LaunchError, Result};
use crate::rpc::{ClientFactory, InstanceRef, LineClientFactory};
use crate::store::RunStore;

pub mod cancel;
pub mod dispatch;
pub mod join;
pub mod registry;

pub use registry::RunRegistry;

/// Store and instance reference, bound once by [`RunLauncher::initialize`].
struct Binding {
    store: Arc<dyn RunStore>,
    instance_ref: InstanceRef,
}

pub struct RunLauncher {
    settings: LauncherSettings,
    clients: Arc<dyn ClientFactory>,
    binding: OnceLock<Binding>,
    registry: RunRegistry,
}

impl fmt::Debug for RunLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLauncher")
            .field("settings", &self.settings)
            .field("initialized", &self.binding.get().is_some())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl RunLauncher {
    /// Create a launcher that builds worker clients with `clients`.
    ///
    /// The launcher is unusable for launching until [`initialize`] binds a
    /// run store; until then `join` is a no-op and cancellation answers
    /// `false`.
    ///
    /// [`initialize`]: RunLauncher::initialize
    pub fn new(settings: LauncherSettings, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            settings,
            clients,
            binding: OnceLock::new(),
            registry: RunRegistry::new(),
        }
    }

    /// Launcher talking to workers over the line-delimited JSON transport,
    /// already bound to the store described by `config`.
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        let clients = Arc::new(LineClientFactory::new(config.launcher.request_timeout));
        let launcher = Self::new(config.launcher, clients);
        launcher.initialize(config.run_store_ref().open(), config.instance_ref())?;
        Ok(launcher)
    }

    /// Bind the run store and the instance reference sent to workers.
    pub fn initialize(&self, store: Arc<dyn RunStore>, instance_ref: InstanceRef) -> Result<()> {
        self.binding
            .set(Binding {
                store,
                instance_ref,
            })
            .map_err(|_| LaunchError::AlreadyInitialized)?;
        info!(wait_for_processes = self.settings.wait_for_processes, "run launcher initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.binding.get().is_some()
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn store(&self) -> Option<&Arc<dyn RunStore>> {
        self.binding.get().map(|b| &b.store)
    }

    pub fn instance_ref(&self) -> Option<&InstanceRef> {
        self.binding.get().map(|b| &b.instance_ref)
    }

    /// `join` with the configured default timeout.
    pub async fn join_default(&self) -> Result<()> {
        self.join(self.settings.join_timeout).await
    }

    pub(crate) fn can_cancel_timeout(&self) -> Duration {
        self.settings.can_cancel_timeout
    }

    fn binding(&self) -> Result<&Binding> {
        self.binding.get().ok_or(LaunchError::NotInitialized)
    }
}
