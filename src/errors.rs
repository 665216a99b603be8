// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::rpc::{ErrorInfo, TransportError};

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The target cannot start runs remotely (no host/port or socket).
    #[error("can't launch runs against target {target}: not served by a remote worker")]
    UnsupportedTarget { target: String },

    /// The worker answered the start request with a failure.
    #[error("launch failed: {message}")]
    LaunchFailed {
        message: String,
        error_info: Option<ErrorInfo>,
    },

    #[error("run launcher has no run store bound")]
    NotInitialized,

    #[error("run launcher is already bound to a run store")]
    AlreadyInitialized,

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("invalid connection metadata: {0}")]
    InvalidConnectionMetadata(String),

    #[error("worker transport error: {0}")]
    Transport(#[from] TransportError),

    /// `join` gave up while these runs were still unfinished.
    #[error("timed out waiting for these runs to finish: {run_ids:?}")]
    JoinTimeout { run_ids: Vec<String> },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LaunchError>;
