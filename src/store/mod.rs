// src/store/mod.rs

//! Run records and the run store boundary.
//!
//! The launcher never owns run records: it reads them from a [`RunStore`],
//! annotates them with tags and asks the store to record status changes.
//! Two backends live here:
//!
//! - [`memory`]: an in-process map, used by tests and embedded callers.
//! - [`file`]: a JSON file, so a launcher can be restarted between launching a
//!   run and cancelling it.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::RunStatus;

pub mod file;
pub mod memory;

pub use file::JsonFileRunStore;
pub use memory::InMemoryRunStore;

/// Tag under which a run's connection metadata is persisted at launch time.
pub const CONNECTION_INFO_TAG: &str = "grpc_info";

/// Reference to the remote origin of the job a run executes.
///
/// This is what a worker needs to locate the job definition on its side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOrigin {
    pub location_name: String,
    pub repository_name: String,
    pub job_name: String,
}

impl JobOrigin {
    pub fn new(
        location_name: impl Into<String>,
        repository_name: impl Into<String>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            location_name: location_name.into(),
            repository_name: repository_name.into(),
            job_name: job_name.into(),
        }
    }
}

/// One execution instance of a job, as held by the run store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub origin: JobOrigin,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl RunRecord {
    pub fn new(run_id: impl Into<String>, origin: JobOrigin) -> Self {
        Self {
            run_id: run_id.into(),
            origin,
            status: RunStatus::NotStarted,
            tags: BTreeMap::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

/// Kind of event recorded against a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// Free-form observability event emitted by the launcher.
    Engine,
    /// Termination was requested.
    Canceling,
    /// Status moved because a worker (or operator) said so.
    StatusChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub kind: RunEventKind,
    pub message: String,
}

/// Durable store of run records.
///
/// Implementations must be safe to share between concurrent callers; every
/// read returns a fresh snapshot rather than a live view.
pub trait RunStore: Send + Sync + Debug {
    /// Insert a new run record (replacing any record with the same id).
    fn add_run(&self, run: RunRecord) -> Result<()>;

    fn get_run_by_id(&self, run_id: &str) -> Result<Option<RunRecord>>;

    /// Merge `tags` into the run's tags, overwriting existing keys.
    fn add_run_tags(&self, run_id: &str, tags: BTreeMap<String, String>) -> Result<()>;

    /// Mark the run as `Canceling` and record why.
    fn report_run_canceling(&self, run: &RunRecord, message: &str) -> Result<()>;

    /// Record an observability event against the run without changing status.
    fn report_engine_event(&self, run: &RunRecord, message: &str) -> Result<()>;

    /// Move the run to `status` (worker progress, operator overrides).
    fn handle_status_change(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Events recorded for a run, oldest first.
    fn events_for(&self, run_id: &str) -> Result<Vec<RunEvent>>;
}

/// Serialisable description of where run records live.
///
/// Sent to workers as part of the instance reference so they can report
/// progress into the same store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStoreRef {
    InMemory,
    JsonFile { path: PathBuf },
}

impl RunStoreRef {
    /// Open the store this reference points at.
    pub fn open(&self) -> Arc<dyn RunStore> {
        match self {
            RunStoreRef::InMemory => Arc::new(InMemoryRunStore::new()),
            RunStoreRef::JsonFile { path } => Arc::new(JsonFileRunStore::new(path)),
        }
    }
}

/// Plain table of runs and their events, shared by the store backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RunTable {
    #[serde(default)]
    runs: BTreeMap<String, RunRecord>,
    #[serde(default)]
    events: BTreeMap<String, Vec<RunEvent>>,
}

impl RunTable {
    pub(crate) fn add_run(&mut self, run: RunRecord) {
        self.runs.insert(run.run_id.clone(), run);
    }

    pub(crate) fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id).cloned()
    }

    fn get_mut(&mut self, run_id: &str) -> Result<&mut RunRecord> {
        self.runs
            .get_mut(run_id)
            .ok_or_else(|| crate::errors::LaunchError::RunNotFound(run_id.to_string()))
    }

    pub(crate) fn add_tags(
        &mut self,
        run_id: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<()> {
        self.get_mut(run_id)?.tags.extend(tags);
        Ok(())
    }

    pub(crate) fn set_status(
        &mut self,
        run_id: &str,
        status: RunStatus,
        kind: RunEventKind,
        message: String,
    ) -> Result<()> {
        self.get_mut(run_id)?.status = status;
        self.push_event(run_id, kind, message);
        Ok(())
    }

    pub(crate) fn push_event(&mut self, run_id: &str, kind: RunEventKind, message: String) {
        self.events
            .entry(run_id.to_string())
            .or_default()
            .push(RunEvent { kind, message });
    }

    pub(crate) fn events(&self, run_id: &str) -> Vec<RunEvent> {
        self.events.get(run_id).cloned().unwrap_or_default()
    }
}
