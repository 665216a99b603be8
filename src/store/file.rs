// src/store/file.rs

//! Run store persisted as a single JSON document.
//!
//! Every operation re-reads the file, so several launcher processes pointed at
//! the same path observe each other's writes. Saves replace the file by
//! rename, so reads never need the lock. Writes within one process are
//! serialised by a mutex; there is no cross-process locking.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{RunEvent, RunEventKind, RunRecord, RunStore, RunTable};
use crate::errors::Result;
use crate::types::RunStatus;

#[derive(Debug)]
pub struct JsonFileRunStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRunStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RunTable> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RunTable::default()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(RunTable::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Replace the file atomically: the table is written to a temp file in
    /// the same directory and renamed over the store, so readers see either
    /// the previous or the new table, never a partial one.
    fn save(&self, table: &RunTable) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("creating dir {dir:?}"))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {dir:?}"))?;
        serde_json::to_writer_pretty(&mut tmp, table)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("replacing run store {:?}", self.path))?;
        debug!(path = ?self.path, "run store saved");
        Ok(())
    }

    /// Load, mutate and save the table while holding the write lock.
    fn update<T>(&self, f: impl FnOnce(&mut RunTable) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.load()?;
        let out = f(&mut table)?;
        self.save(&table)?;
        Ok(out)
    }
}

impl RunStore for JsonFileRunStore {
    fn add_run(&self, run: RunRecord) -> Result<()> {
        self.update(|table| {
            table.add_run(run);
            Ok(())
        })
    }

    fn get_run_by_id(&self, run_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.load()?.get(run_id))
    }

    fn add_run_tags(&self, run_id: &str, tags: BTreeMap<String, String>) -> Result<()> {
        self.update(|table| table.add_tags(run_id, tags))
    }

    fn report_run_canceling(&self, run: &RunRecord, message: &str) -> Result<()> {
        self.update(|table| {
            table.set_status(
                &run.run_id,
                RunStatus::Canceling,
                RunEventKind::Canceling,
                message.to_string(),
            )
        })
    }

    fn report_engine_event(&self, run: &RunRecord, message: &str) -> Result<()> {
        self.update(|table| {
            table.push_event(&run.run_id, RunEventKind::Engine, message.to_string());
            Ok(())
        })
    }

    fn handle_status_change(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.update(|table| {
            table.set_status(
                run_id,
                status,
                RunEventKind::StatusChange,
                format!("run status changed to {status}"),
            )
        })
    }

    fn events_for(&self, run_id: &str) -> Result<Vec<RunEvent>> {
        Ok(self.load()?.events(run_id))
    }
}
