// src/launcher/registry.rs

//! Membership set of runs launched by one launcher.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::target::WorkerProcess;

/// Runs this launcher started, plus worker processes it owns.
///
/// Membership is advisory: a run id is never removed once inserted, and
/// whether the run is still going is always re-read from the run store. The
/// registry is not a status cache.
#[derive(Debug, Default)]
pub struct RunRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Insertion order, for stable reporting.
    order: Vec<String>,
    members: HashSet<String>,
    processes: Vec<Arc<WorkerProcess>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a launched run. Returns false if it was already present.
    pub fn insert(&self, run_id: &str) -> bool {
        let mut inner = self.inner();
        if !inner.members.insert(run_id.to_string()) {
            return false;
        }
        inner.order.push(run_id.to_string());
        true
    }

    pub fn contains(&self, run_id: &str) -> bool {
        self.inner().members.contains(run_id)
    }

    /// Snapshot of registered run ids in launch order.
    pub fn run_ids(&self) -> Vec<String> {
        self.inner().order.clone()
    }

    pub fn len(&self) -> usize {
        self.inner().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_process(&self, process: Arc<WorkerProcess>) {
        self.inner().processes.push(process);
    }

    /// Snapshot of owned worker processes in registration order.
    pub fn processes(&self) -> Vec<Arc<WorkerProcess>> {
        self.inner().processes.clone()
    }
}
