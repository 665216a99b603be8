// src/launcher/join.rs

use std::time::Duration;

use tracing::{debug, info};

use super::RunLauncher;
use crate::errors::{LaunchError, Result};

impl RunLauncher {
    /// Registered runs whose record exists and is not yet finished.
    pub fn active_run_ids(&self) -> Result<Vec<String>> {
        let Some(store) = self.store() else {
            return Ok(Vec::new());
        };

        let mut active = Vec::new();
        for run_id in self.registry.run_ids() {
            if let Some(run) = store.get_run_by_id(&run_id)? {
                if !run.is_finished() {
                    active.push(run_id);
                }
            }
        }
        Ok(active)
    }

    /// Wait until every run this launcher started has finished.
    ///
    /// Polls the run store, sleeping `initial_poll_interval` first and
    /// doubling the sleep each round up to `max_poll_interval`. Fails with
    /// [`LaunchError::JoinTimeout`] once the accumulated sleep reaches
    /// `timeout` while runs are still unfinished. A launcher with no store
    /// bound has nothing to wait for.
    pub async fn join(&self, timeout: Duration) -> Result<()> {
        if !self.is_initialized() {
            return Ok(());
        }

        let mut waited = Duration::ZERO;
        let mut interval = self.settings.initial_poll_interval;

        loop {
            let active = self.active_run_ids()?;
            if active.is_empty() {
                debug!(?waited, "all launched runs finished");
                return Ok(());
            }

            if waited >= timeout {
                return Err(LaunchError::JoinTimeout { run_ids: active });
            }

            debug!(
                active = active.len(),
                interval_ms = interval.as_millis() as u64,
                "waiting for launched runs to finish"
            );
            tokio::time::sleep(interval).await;
            waited += interval;
            interval = interval
                .saturating_mul(2)
                .min(self.settings.max_poll_interval);
        }
    }

    /// Release the launcher.
    ///
    /// With `wait_for_processes` set, waits for every owned worker process to
    /// exit, in the order they were registered. There is no deadline: a
    /// worker that never exits blocks here forever.
    pub async fn dispose(&self) -> Result<()> {
        if !self.settings.wait_for_processes {
            return Ok(());
        }

        for process in self.registry.processes() {
            info!(worker = %process.name(), pid = process.id(), "waiting for worker process to exit");
            let status = process.wait().await?;
            debug!(worker = %process.name(), ?status, "worker process finished");
        }
        Ok(())
    }
}
