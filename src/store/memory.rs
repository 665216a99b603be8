// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{RunEvent, RunEventKind, RunRecord, RunStore, RunTable};
use crate::errors::Result;
use crate::types::RunStatus;

/// Run store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    table: Mutex<RunTable>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, RunTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RunStore for InMemoryRunStore {
    fn add_run(&self, run: RunRecord) -> Result<()> {
        self.table().add_run(run);
        Ok(())
    }

    fn get_run_by_id(&self, run_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.table().get(run_id))
    }

    fn add_run_tags(&self, run_id: &str, tags: BTreeMap<String, String>) -> Result<()> {
        self.table().add_tags(run_id, tags)
    }

    fn report_run_canceling(&self, run: &RunRecord, message: &str) -> Result<()> {
        self.table().set_status(
            &run.run_id,
            RunStatus::Canceling,
            RunEventKind::Canceling,
            message.to_string(),
        )
    }

    fn report_engine_event(&self, run: &RunRecord, message: &str) -> Result<()> {
        self.table()
            .push_event(&run.run_id, RunEventKind::Engine, message.to_string());
        Ok(())
    }

    fn handle_status_change(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.table().set_status(
            run_id,
            status,
            RunEventKind::StatusChange,
            format!("run status changed to {status}"),
        )
    }

    fn events_for(&self, run_id: &str) -> Result<Vec<RunEvent>> {
        Ok(self.table().events(run_id))
    }
}
