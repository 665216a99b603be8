// src/launcher/cancel.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::RunLauncher;
use crate::errors::Result;
use crate::rpc::{CanCancelRequest, CancelRequest, WorkerClient};
use crate::store::{CONNECTION_INFO_TAG, RunStore};
use crate::target::ConnectionMetadata;

const NO_CLIENT_MESSAGE: &str = "Unable to get a worker client to send termination request to.";
const CANCELING_MESSAGE: &str = "Sending run termination request.";

impl RunLauncher {
    /// Rebuild a client for the worker running `run_id` from the connection
    /// metadata persisted at launch.
    ///
    /// `None` when the run does not exist, is already finished, or was never
    /// tagged with connection metadata.
    pub fn client_for_termination(&self, run_id: &str) -> Result<Option<Arc<dyn WorkerClient>>> {
        match self.store() {
            Some(store) => self.termination_client(store.as_ref(), run_id),
            None => Ok(None),
        }
    }

    fn termination_client(
        &self,
        store: &dyn RunStore,
        run_id: &str,
    ) -> Result<Option<Arc<dyn WorkerClient>>> {
        let Some(run) = store.get_run_by_id(run_id)? else {
            return Ok(None);
        };
        if run.is_finished() {
            return Ok(None);
        }
        let Some(tag) = run.tags.get(CONNECTION_INFO_TAG) else {
            return Ok(None);
        };

        let connection = ConnectionMetadata::from_tag_value(tag)?;
        Ok(Some(self.clients.client_for(&connection)))
    }

    /// Whether the worker running `run_id` says it can cancel it.
    ///
    /// An unreachable worker is not an error: it has most likely exited, so
    /// the answer is simply `false`. Any other transport failure (a garbled
    /// or rejected reply, an unsupported channel) is returned as
    /// [`LaunchError::Transport`].
    ///
    /// [`LaunchError::Transport`]: crate::errors::LaunchError::Transport
    pub async fn can_terminate(&self, run_id: &str) -> Result<bool> {
        let Some(client) = self.client_for_termination(run_id)? else {
            debug!(run_id, "no worker client for run; cannot terminate");
            return Ok(false);
        };

        let request = CanCancelRequest {
            run_id: run_id.to_string(),
        };
        match client
            .can_cancel_execution(request, self.can_cancel_timeout())
            .await
        {
            Ok(response) => Ok(response.can_cancel),
            Err(err) if err.is_unreachable() => {
                debug!(run_id, error = %err, "worker that launched the run may no longer exist");
                Ok(false)
            }
            Err(err) => {
                warn!(run_id, error = %err, "can-cancel query failed");
                Err(err.into())
            }
        }
    }

    /// Ask the worker running `run_id` to cancel it.
    ///
    /// The run is marked `Canceling` before the request goes out, so the
    /// status can show `Canceling` even when the worker never acts on it.
    /// Completion of the cancellation is only observable through the store.
    ///
    /// A worker that cannot be reached yields `false`; other transport
    /// failures are recorded as an engine event and then returned.
    pub async fn terminate(&self, run_id: &str) -> Result<bool> {
        let Some(store) = self.store() else {
            return Ok(false);
        };
        let Some(run) = store.get_run_by_id(run_id)? else {
            debug!(run_id, "terminate requested for unknown run");
            return Ok(false);
        };

        let Some(client) = self.termination_client(store.as_ref(), run_id)? else {
            info!(run_id, "no worker client to send termination request to");
            store.report_engine_event(&run, NO_CLIENT_MESSAGE)?;
            return Ok(false);
        };

        store.report_run_canceling(&run, CANCELING_MESSAGE)?;

        let request = CancelRequest {
            run_id: run_id.to_string(),
        };
        match client.cancel_execution(request).await {
            Ok(response) => {
                info!(run_id, success = response.success, "worker answered termination request");
                Ok(response.success)
            }
            Err(err) => {
                warn!(run_id, error = %err, "termination request could not be delivered");
                store.report_engine_event(
                    &run,
                    &format!("Termination request could not be delivered: {err}"),
                )?;
                if err.is_unreachable() {
                    Ok(false)
                } else {
                    Err(err.into())
                }
            }
        }
    }
}
