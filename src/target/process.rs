// src/target/process.rs

//! Worker processes spawned and owned by the launcher.

use std::collections::BTreeMap;
use std::fmt;
use std::process::{ExitStatus, Stdio};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::Result;

/// How to start a worker server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Waitable handle to a worker process.
///
/// The child is killed if the handle is dropped while it is still running.
pub struct WorkerProcess {
    name: String,
    pid: Option<u32>,
    child: Mutex<Child>,
}

impl fmt::Debug for WorkerProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerProcess")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl WorkerProcess {
    /// Spawn `command`. Must be called from within a Tokio runtime.
    pub fn spawn(name: &str, command: &WorkerCommand) -> Result<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning worker process for '{name}'"))?;

        let pid = child.id();
        info!(worker = %name, pid, program = %command.program, "spawned worker process");

        // Always drain output so pipe buffers don't fill up; log at debug.
        if let Some(stdout) = child.stdout.take() {
            forward_lines(name.to_string(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(name.to_string(), "stderr", stderr);
        }

        Ok(Self {
            name: name.to_string(),
            pid,
            child: Mutex::new(child),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id, if the process had one when spawned.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the process to exit. Not time-bounded.
    ///
    /// Safe to call repeatedly; later calls return the recorded exit status.
    pub async fn wait(&self) -> Result<ExitStatus> {
        let mut child = self.child.lock().await;
        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for worker process '{}'", self.name))?;
        debug!(worker = %self.name, pid = self.pid, ?status, "worker process exited");
        Ok(status)
    }

    /// Kill the process and reap it.
    pub async fn kill(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        child
            .kill()
            .await
            .with_context(|| format!("killing worker process '{}'", self.name))?;
        Ok(())
    }
}

fn forward_lines<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(worker = %name, stream, "{}", line);
        }
    });
}
