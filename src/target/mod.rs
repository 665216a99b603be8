// src/target/mod.rs

//! Execution targets: where a run is sent to execute.
//!
//! - [`LaunchTarget`] is implemented by every target. Only targets that can
//!   start runs on a remote worker hand out a [`RemoteTarget`] view.
//! - [`ConnectionMetadata`] is the serialisable projection of a remote target
//!   that gets written into a run tag, so an RPC client can be rebuilt later
//!   without the launch-time target object.
//! - [`process`] owns worker processes spawned by us.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{LaunchError, Result};

pub mod process;

pub use process::{WorkerCommand, WorkerProcess};

/// Address of a worker's RPC server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Socket { path: PathBuf },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            Endpoint::Socket { path } => write!(f, "unix:{}", path.display()),
        }
    }
}

/// What is needed to reconnect to a run's worker after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawConnectionMetadata", into = "RawConnectionMetadata")]
pub struct ConnectionMetadata {
    pub endpoint: Endpoint,
    pub use_ssl: bool,
}

impl ConnectionMetadata {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            endpoint: Endpoint::Tcp {
                host: host.into(),
                port,
            },
            use_ssl: false,
        }
    }

    pub fn socket(path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: Endpoint::Socket { path: path.into() },
            use_ssl: false,
        }
    }

    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// JSON form stored under the connection-info run tag.
    pub fn to_tag_value(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_tag_value(value: &str) -> Result<Self> {
        serde_json::from_str(value)
            .map_err(|e| LaunchError::InvalidConnectionMetadata(e.to_string()))
    }
}

/// Wire shape of [`ConnectionMetadata`]: `{"host", "port"}` or `{"socket"}`,
/// plus `"use_ssl": true` when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawConnectionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    socket: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    use_ssl: Option<bool>,
}

impl TryFrom<RawConnectionMetadata> for ConnectionMetadata {
    type Error = String;

    fn try_from(raw: RawConnectionMetadata) -> std::result::Result<Self, Self::Error> {
        let endpoint = match (raw.host, raw.port, raw.socket) {
            (Some(host), Some(port), None) => Endpoint::Tcp { host, port },
            (None, None, Some(path)) => Endpoint::Socket { path },
            (Some(_), _, Some(_)) => {
                return Err("both host and socket are set".to_string());
            }
            (Some(host), None, None) => {
                return Err(format!("host '{host}' has no port"));
            }
            (None, Some(port), _) => {
                return Err(format!("port {port} has no host"));
            }
            (None, None, None) => {
                return Err("neither host nor socket is set".to_string());
            }
        };

        Ok(ConnectionMetadata {
            endpoint,
            use_ssl: raw.use_ssl.unwrap_or(false),
        })
    }
}

impl From<ConnectionMetadata> for RawConnectionMetadata {
    fn from(meta: ConnectionMetadata) -> Self {
        let mut raw = RawConnectionMetadata {
            use_ssl: meta.use_ssl.then_some(true),
            ..Default::default()
        };
        match meta.endpoint {
            Endpoint::Tcp { host, port } => {
                raw.host = Some(host);
                raw.port = Some(port);
            }
            Endpoint::Socket { path } => raw.socket = Some(path),
        }
        raw
    }
}

/// Anything a run can be launched against.
pub trait LaunchTarget: Send + Sync + fmt::Debug {
    /// Human-readable description used in errors and logs.
    fn describe(&self) -> String;

    /// Remote-start capability, if this target has one.
    fn remote(&self) -> Option<&dyn RemoteTarget>;
}

/// A target served by a worker reachable over RPC.
pub trait RemoteTarget: Send + Sync {
    fn connection(&self) -> &ConnectionMetadata;

    /// Worker process owned by this target, if we spawned it.
    fn owned_process(&self) -> Option<Arc<WorkerProcess>> {
        None
    }
}

/// A worker server that someone else started and keeps running.
#[derive(Debug, Clone)]
pub struct ServerTarget {
    pub location_name: String,
    pub connection: ConnectionMetadata,
}

impl ServerTarget {
    pub fn new(location_name: impl Into<String>, connection: ConnectionMetadata) -> Self {
        Self {
            location_name: location_name.into(),
            connection,
        }
    }
}

impl LaunchTarget for ServerTarget {
    fn describe(&self) -> String {
        format!("server '{}' at {}", self.location_name, self.connection.endpoint)
    }

    fn remote(&self) -> Option<&dyn RemoteTarget> {
        Some(self)
    }
}

impl RemoteTarget for ServerTarget {
    fn connection(&self) -> &ConnectionMetadata {
        &self.connection
    }
}

/// A worker server whose process we spawned and own.
#[derive(Debug, Clone)]
pub struct ManagedServerTarget {
    pub location_name: String,
    pub connection: ConnectionMetadata,
    process: Arc<WorkerProcess>,
}

impl ManagedServerTarget {
    /// Spawn `command` and treat it as the worker serving `connection`.
    ///
    /// The caller is responsible for the command actually listening on that
    /// endpoint; nothing here waits for the server to come up.
    pub fn spawn(
        location_name: impl Into<String>,
        connection: ConnectionMetadata,
        command: &WorkerCommand,
    ) -> Result<Self> {
        let location_name = location_name.into();
        let process = WorkerProcess::spawn(&location_name, command)?;
        Ok(Self {
            location_name,
            connection,
            process: Arc::new(process),
        })
    }

    /// Wrap an already-spawned worker process.
    pub fn from_process(
        location_name: impl Into<String>,
        connection: ConnectionMetadata,
        process: Arc<WorkerProcess>,
    ) -> Self {
        Self {
            location_name: location_name.into(),
            connection,
            process,
        }
    }

    pub fn process(&self) -> &Arc<WorkerProcess> {
        &self.process
    }
}

impl LaunchTarget for ManagedServerTarget {
    fn describe(&self) -> String {
        format!(
            "managed server '{}' at {} (pid {:?})",
            self.location_name,
            self.connection.endpoint,
            self.process.id()
        )
    }

    fn remote(&self) -> Option<&dyn RemoteTarget> {
        Some(self)
    }
}

impl RemoteTarget for ManagedServerTarget {
    fn connection(&self) -> &ConnectionMetadata {
        &self.connection
    }

    fn owned_process(&self) -> Option<Arc<WorkerProcess>> {
        Some(Arc::clone(&self.process))
    }
}

/// Job definitions loaded into the current process. There is no worker to
/// send a start request to, so runs cannot be launched against it.
#[derive(Debug, Clone)]
pub struct InProcessTarget {
    pub location_name: String,
}

impl InProcessTarget {
    pub fn new(location_name: impl Into<String>) -> Self {
        Self {
            location_name: location_name.into(),
        }
    }
}

impl LaunchTarget for InProcessTarget {
    fn describe(&self) -> String {
        format!("in-process location '{}'", self.location_name)
    }

    fn remote(&self) -> Option<&dyn RemoteTarget> {
        None
    }
}
