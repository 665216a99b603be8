// src/rpc/mod.rs

//! Worker RPC boundary.
//!
//! The launcher only talks to workers through [`WorkerClient`], built by a
//! [`ClientFactory`] from persisted [`ConnectionMetadata`]. Production code
//! uses [`LineClientFactory`]; tests swap in a fake factory that records calls
//! and scripts responses.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{JobOrigin, RunStoreRef};
use crate::target::ConnectionMetadata;

pub mod line_client;

pub use line_client::{LineClient, LineClientFactory};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Serialisable summary of an error raised on the worker side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default)]
    pub cls_name: Option<String>,
    #[serde(default)]
    pub stack: Vec<String>,
    #[serde(default)]
    pub cause: Option<Box<ErrorInfo>>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cls_name: None,
            stack: Vec::new(),
            cause: None,
        }
    }
}

/// Reference to the launcher's durable configuration, so the worker can
/// build a compatible execution context (most importantly, the same store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    pub run_store: RunStoreRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRunRequest {
    #[serde(rename = "pipeline_origin")]
    pub origin: JobOrigin,
    #[serde(rename = "pipeline_run_id")]
    pub run_id: String,
    pub instance_ref: InstanceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "serializable_error_info")]
    pub error_info: Option<ErrorInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanCancelRequest {
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanCancelResponse {
    pub can_cancel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// One request on the wire, tagged by method name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum WorkerRequest {
    StartRun(StartRunRequest),
    CanCancelExecution(CanCancelRequest),
    CancelExecution(CancelRequest),
}

/// Failures of the channel to a worker, as opposed to answers from it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("worker at {endpoint} is unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("request to worker at {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("TLS is not supported by this transport (worker at {endpoint})")]
    TlsUnsupported { endpoint: String },

    #[error("endpoint {endpoint} is not supported: {reason}")]
    UnsupportedEndpoint { endpoint: String, reason: String },

    #[error("protocol error talking to worker at {endpoint}: {reason}")]
    Protocol { endpoint: String, reason: String },

    #[error("worker at {endpoint} rejected the request: {message}")]
    Remote { endpoint: String, message: String },
}

impl TransportError {
    /// True when the worker could not be reached at all (it has most likely
    /// exited), rather than answering badly.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            TransportError::Unreachable { .. } | TransportError::Timeout { .. }
        )
    }
}

/// Client for one worker's RPC server.
pub trait WorkerClient: Send + Sync {
    fn start_run(
        &self,
        request: StartRunRequest,
    ) -> BoxFuture<'_, Result<StartRunResponse, TransportError>>;

    /// Ask whether the worker is able to cancel `run_id`, giving up after
    /// `timeout`.
    fn can_cancel_execution(
        &self,
        request: CanCancelRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<CanCancelResponse, TransportError>>;

    fn cancel_execution(
        &self,
        request: CancelRequest,
    ) -> BoxFuture<'_, Result<CancelResponse, TransportError>>;
}

/// Builds worker clients from connection metadata.
///
/// Building a client never touches the network; failures surface on the
/// first call.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, connection: &ConnectionMetadata) -> Arc<dyn WorkerClient>;
}
