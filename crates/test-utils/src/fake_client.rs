use std::sync::{Arc, Mutex};
use std::time::Duration;

use runlaunch::rpc::{
    BoxFuture, CanCancelRequest, CanCancelResponse, CancelRequest, CancelResponse,
    ClientFactory, ErrorInfo, StartRunRequest, StartRunResponse, TransportError, WorkerClient,
};
use runlaunch::target::ConnectionMetadata;

/// One call received by a fake worker.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    StartRun(StartRunRequest),
    CanCancel { run_id: String, timeout: Duration },
    Cancel { run_id: String },
}

type CancelHook = Arc<dyn Fn(&str) + Send + Sync>;

struct FakeState {
    connections: Vec<ConnectionMetadata>,
    calls: Vec<FakeCall>,
    start: Result<StartRunResponse, TransportError>,
    can_cancel: Result<CanCancelResponse, TransportError>,
    cancel: Result<CancelResponse, TransportError>,
    on_cancel: Option<CancelHook>,
}

/// A fake worker that:
/// - records every client built (by connection) and every call made
/// - answers calls from scripted responses (success by default).
///
/// It is its own [`ClientFactory`]: every client it hands out shares the same
/// script and call log.
#[derive(Clone)]
pub struct FakeWorker {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                connections: Vec::new(),
                calls: Vec::new(),
                start: Ok(StartRunResponse {
                    success: true,
                    message: None,
                    error_info: None,
                }),
                can_cancel: Ok(CanCancelResponse { can_cancel: true }),
                cancel: Ok(CancelResponse {
                    success: true,
                    message: None,
                }),
                on_cancel: None,
            })),
        }
    }

    /// Make `start_run` report failure with `message`.
    pub fn fail_start(&self, message: &str) -> &Self {
        self.state.lock().unwrap().start = Ok(StartRunResponse {
            success: false,
            message: Some(message.to_string()),
            error_info: Some(ErrorInfo::new(message)),
        });
        self
    }

    pub fn set_can_cancel(&self, can_cancel: bool) -> &Self {
        self.state.lock().unwrap().can_cancel = Ok(CanCancelResponse { can_cancel });
        self
    }

    pub fn set_cancel_success(&self, success: bool) -> &Self {
        self.state.lock().unwrap().cancel = Ok(CancelResponse {
            success,
            message: None,
        });
        self
    }

    /// Make every call fail as if the worker process had exited.
    pub fn unreachable(&self) -> &Self {
        self.fail_with(TransportError::Unreachable {
            endpoint: "fake".to_string(),
            reason: "connection refused".to_string(),
        })
    }

    /// Make every call fail with `err`.
    pub fn fail_with(&self, err: TransportError) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.start = Err(err.clone());
        state.can_cancel = Err(err.clone());
        state.cancel = Err(err);
        drop(state);
        self
    }

    /// Run `hook` with the run id when `cancel_execution` is received, before
    /// the reply is produced.
    pub fn on_cancel(&self, hook: impl Fn(&str) + Send + Sync + 'static) -> &Self {
        self.state.lock().unwrap().on_cancel = Some(Arc::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn connections(&self) -> Vec<ConnectionMetadata> {
        self.state.lock().unwrap().connections.clone()
    }

    pub fn start_requests(&self) -> Vec<StartRunRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FakeCall::StartRun(req) => Some(req),
                _ => None,
            })
            .collect()
    }
}

impl ClientFactory for FakeWorker {
    fn client_for(&self, connection: &ConnectionMetadata) -> Arc<dyn WorkerClient> {
        self.state.lock().unwrap().connections.push(connection.clone());
        Arc::new(FakeClient {
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeClient {
    state: Arc<Mutex<FakeState>>,
}

impl WorkerClient for FakeClient {
    fn start_run(
        &self,
        request: StartRunRequest,
    ) -> BoxFuture<'_, Result<StartRunResponse, TransportError>> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(FakeCall::StartRun(request));
            state.start.clone()
        };
        Box::pin(async move { reply })
    }

    fn can_cancel_execution(
        &self,
        request: CanCancelRequest,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<CanCancelResponse, TransportError>> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(FakeCall::CanCancel {
                run_id: request.run_id,
                timeout,
            });
            state.can_cancel.clone()
        };
        Box::pin(async move { reply })
    }

    fn cancel_execution(
        &self,
        request: CancelRequest,
    ) -> BoxFuture<'_, Result<CancelResponse, TransportError>> {
        let (reply, hook) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(FakeCall::Cancel {
                run_id: request.run_id.clone(),
            });
            (state.cancel.clone(), state.on_cancel.clone())
        };
        if let Some(hook) = hook {
            hook(&request.run_id);
        }
        Box::pin(async move { reply })
    }
}
