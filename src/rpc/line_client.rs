// src/rpc/line_client.rs

//! Worker client speaking newline-delimited JSON.
//!
//! Each call opens a fresh connection, writes one [`WorkerRequest`] line and
//! reads one response line. A response of the form `{"error": "..."}` is a
//! rejection by the worker; anything else is decoded as the method's response
//! type.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use super::{
    BoxFuture, CanCancelRequest, CanCancelResponse, CancelRequest, CancelResponse,
    ClientFactory, StartRunRequest, StartRunResponse, TransportError, WorkerClient,
    WorkerRequest,
};
use crate::target::{ConnectionMetadata, Endpoint};

#[derive(Debug, Clone)]
pub struct LineClient {
    connection: ConnectionMetadata,
    request_timeout: Duration,
}

impl LineClient {
    pub fn new(connection: ConnectionMetadata, request_timeout: Duration) -> Self {
        Self {
            connection,
            request_timeout,
        }
    }

    pub fn connection(&self) -> &ConnectionMetadata {
        &self.connection
    }

    fn endpoint(&self) -> String {
        self.connection.endpoint.to_string()
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: WorkerRequest,
        timeout: Duration,
    ) -> Result<T, TransportError> {
        let endpoint = self.endpoint();

        if self.connection.use_ssl {
            return Err(TransportError::TlsUnsupported { endpoint });
        }

        let line = serde_json::to_string(&request).map_err(|e| TransportError::Protocol {
            endpoint: endpoint.clone(),
            reason: format!("encoding request: {e}"),
        })?;

        debug!(%endpoint, ?timeout, "sending worker request");
        let reply = match tokio::time::timeout(timeout, self.round_trip(line)).await {
            Ok(reply) => reply?,
            Err(_) => return Err(TransportError::Timeout { endpoint, timeout }),
        };
        trace!(%endpoint, %reply, "worker reply");

        decode_reply(&endpoint, &reply)
    }

    async fn round_trip(&self, line: String) -> Result<String, TransportError> {
        let endpoint = self.endpoint();
        match &self.connection.endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| unreachable_err(&endpoint, e))?;
                exchange(stream, line, &endpoint).await
            }
            #[cfg(unix)]
            Endpoint::Socket { path } => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|e| unreachable_err(&endpoint, e))?;
                exchange(stream, line, &endpoint).await
            }
            #[cfg(not(unix))]
            Endpoint::Socket { .. } => Err(TransportError::UnsupportedEndpoint {
                endpoint,
                reason: "unix sockets are not available on this platform".to_string(),
            }),
        }
    }
}

fn unreachable_err(endpoint: &str, err: std::io::Error) -> TransportError {
    TransportError::Unreachable {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    }
}

async fn exchange<S>(stream: S, line: String, endpoint: &str) -> Result<String, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);

    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| unreachable_err(endpoint, e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| unreachable_err(endpoint, e))?;
    writer.flush().await.map_err(|e| unreachable_err(endpoint, e))?;

    let mut lines = BufReader::new(reader).lines();
    match lines.next_line().await {
        Ok(Some(reply)) => Ok(reply),
        Ok(None) => Err(TransportError::Unreachable {
            endpoint: endpoint.to_string(),
            reason: "connection closed before a reply was received".to_string(),
        }),
        Err(e) => Err(unreachable_err(endpoint, e)),
    }
}

fn decode_reply<T: DeserializeOwned>(endpoint: &str, reply: &str) -> Result<T, TransportError> {
    let protocol = |reason: String| TransportError::Protocol {
        endpoint: endpoint.to_string(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(reply).map_err(|e| protocol(format!("invalid JSON reply: {e}")))?;

    if let Some(message) = value.get("error") {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Err(TransportError::Remote {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    serde_json::from_value(value).map_err(|e| protocol(format!("unexpected reply shape: {e}")))
}

impl WorkerClient for LineClient {
    fn start_run(
        &self,
        request: StartRunRequest,
    ) -> BoxFuture<'_, Result<StartRunResponse, TransportError>> {
        Box::pin(self.call(WorkerRequest::StartRun(request), self.request_timeout))
    }

    fn can_cancel_execution(
        &self,
        request: CanCancelRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<CanCancelResponse, TransportError>> {
        Box::pin(self.call(WorkerRequest::CanCancelExecution(request), timeout))
    }

    fn cancel_execution(
        &self,
        request: CancelRequest,
    ) -> BoxFuture<'_, Result<CancelResponse, TransportError>> {
        Box::pin(self.call(WorkerRequest::CancelExecution(request), self.request_timeout))
    }
}

/// Builds [`LineClient`]s sharing one request timeout.
#[derive(Debug, Clone)]
pub struct LineClientFactory {
    request_timeout: Duration,
}

impl LineClientFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl ClientFactory for LineClientFactory {
    fn client_for(&self, connection: &ConnectionMetadata) -> Arc<dyn WorkerClient> {
        Arc::new(LineClient::new(connection.clone(), self.request_timeout))
    }
}
