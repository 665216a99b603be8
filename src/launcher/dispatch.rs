// src/launcher/dispatch.rs

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::RunLauncher;
use crate::errors::{LaunchError, Result};
use crate::rpc::StartRunRequest;
use crate::store::{CONNECTION_INFO_TAG, RunRecord};
use crate::target::LaunchTarget;

impl RunLauncher {
    /// Start `run` on the worker behind `target`.
    ///
    /// In order: the target's connection metadata is written to the run's
    /// tags, the worker is asked to start the run, and only if it accepts is
    /// the run registered (together with the target's worker process, if we
    /// own one).
    ///
    /// The tag write is not undone when the worker refuses the run, so a
    /// failed launch leaves connection metadata behind on the record.
    pub async fn launch(&self, mut run: RunRecord, target: &dyn LaunchTarget) -> Result<RunRecord> {
        let binding = self.binding()?;

        let Some(remote) = target.remote() else {
            warn!(run_id = %run.run_id, target = %target.describe(), "target cannot start runs remotely");
            return Err(LaunchError::UnsupportedTarget {
                target: target.describe(),
            });
        };

        let connection = remote.connection();
        let tag_value = connection.to_tag_value()?;
        binding.store.add_run_tags(
            &run.run_id,
            BTreeMap::from([(CONNECTION_INFO_TAG.to_string(), tag_value.clone())]),
        )?;
        run.tags.insert(CONNECTION_INFO_TAG.to_string(), tag_value);

        info!(
            run_id = %run.run_id,
            job = %run.origin.job_name,
            endpoint = %connection.endpoint,
            "sending start request to worker"
        );

        let client = self.clients.client_for(connection);
        let response = client
            .start_run(StartRunRequest {
                origin: run.origin.clone(),
                run_id: run.run_id.clone(),
                instance_ref: binding.instance_ref.clone(),
            })
            .await?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "worker did not start the run".to_string());
            warn!(run_id = %run.run_id, %message, "worker refused to start run");
            return Err(LaunchError::LaunchFailed {
                message,
                error_info: response.error_info,
            });
        }

        self.registry.insert(&run.run_id);
        if let Some(process) = remote.owned_process() {
            self.registry.push_process(process);
        }

        info!(run_id = %run.run_id, "run launched");
        Ok(run)
    }
}
