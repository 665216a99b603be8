#![allow(dead_code)]

use std::sync::Arc;

use runlaunch::config::LauncherSettings;
use runlaunch::launcher::RunLauncher;
use runlaunch::rpc::{ClientFactory, InstanceRef};
use runlaunch::store::{CONNECTION_INFO_TAG, JobOrigin, RunRecord, RunStore, RunStoreRef};
use runlaunch::target::ConnectionMetadata;
use runlaunch::types::RunStatus;

/// Builder for `RunRecord` to simplify test setup.
pub struct RunRecordBuilder {
    run: RunRecord,
}

impl RunRecordBuilder {
    pub fn new(run_id: &str) -> Self {
        Self {
            run: RunRecord::new(run_id, JobOrigin::new("test_location", "test_repo", "test_job")),
        }
    }

    pub fn job(mut self, job_name: &str) -> Self {
        self.run.origin.job_name = job_name.to_string();
        self
    }

    pub fn status(mut self, status: RunStatus) -> Self {
        self.run.status = status;
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.run.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Tag the run as if it had been launched against `connection`.
    pub fn launched_on(self, connection: &ConnectionMetadata) -> Self {
        let value = connection
            .to_tag_value()
            .expect("connection metadata serialises");
        self.tag(CONNECTION_INFO_TAG, &value)
    }

    pub fn build(self) -> RunRecord {
        self.run
    }

    /// Build and insert into `store`, returning the record.
    pub fn insert_into(self, store: &dyn RunStore) -> RunRecord {
        let run = self.build();
        store.add_run(run.clone()).expect("adding run to store");
        run
    }
}

/// Settings with short poll intervals, suitable for tests.
pub fn fast_settings() -> LauncherSettings {
    LauncherSettings {
        initial_poll_interval: std::time::Duration::from_millis(1),
        max_poll_interval: std::time::Duration::from_millis(20),
        ..LauncherSettings::default()
    }
}

/// A launcher bound to `store`, building clients with `clients`.
pub fn bound_launcher(
    settings: LauncherSettings,
    clients: Arc<dyn ClientFactory>,
    store: Arc<dyn RunStore>,
) -> RunLauncher {
    let launcher = RunLauncher::new(settings, clients);
    launcher
        .initialize(
            store,
            InstanceRef {
                config_path: None,
                run_store: RunStoreRef::InMemory,
            },
        )
        .expect("fresh launcher binds");
    launcher
}
