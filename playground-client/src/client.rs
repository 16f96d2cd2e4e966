//! The streaming run client.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use playground_api::{Bundle, ConsoleEvent, RunRequest};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;

use crate::run_state::{RunId, RunState, RunStatus, RunUpdate};
use crate::{transport, ClientConfig, ClientError};

/// Buffered updates per subscriber before it starts lagging.
const UPDATE_CAPACITY: usize = 256;

/// Runs bundles against the compile endpoint, one run at a time.
///
/// The client must be created inside a tokio runtime; transports are
/// spawned onto that runtime.
pub struct StreamingRunClient {
    config: ClientConfig,
    http: reqwest::Client,
    runtime: Handle,
    shared: Arc<Shared>,
}

/// State shared between the client and its transport task.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    updates: broadcast::Sender<RunUpdate>,
    status: watch::Sender<RunStatus>,
}

struct Inner {
    state: RunState,
    /// Transport of the most recent run, aborted on stop and reset.
    transport: Option<AbortHandle>,
}

impl Shared {
    fn new() -> Self {
        let state = RunState::new();
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let (status, _) = watch::channel(state.status());
        Self {
            inner: Mutex::new(Inner {
                state,
                transport: None,
            }),
            updates,
            status,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the run state and publish whatever it changed.
    ///
    /// Publishing happens under the lock so subscribers see updates in the
    /// order they were applied.
    pub(crate) fn apply<T>(&self, f: impl FnOnce(&mut RunState) -> T) -> T {
        let mut inner = self.lock();
        let out = f(&mut inner.state);
        self.publish(&mut inner);
        out
    }

    fn publish(&self, inner: &mut Inner) {
        for update in inner.state.drain_updates() {
            // No subscribers is fine
            let _ = self.updates.send(update);
        }
        self.status.send_replace(inner.state.status());
    }
}

impl StreamingRunClient {
    /// Create a client bound to the current tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let runtime = Handle::try_current()?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_http(config, http, runtime))
    }

    /// Create a client with an existing HTTP client and runtime handle.
    pub fn with_http(config: ClientConfig, http: reqwest::Client, runtime: Handle) -> Self {
        Self {
            config,
            http,
            runtime,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Start running `bundle`.
    ///
    /// Returns `None` and does nothing if a run is already active. Otherwise
    /// the console is reset to a single "Running..." line and the request is
    /// issued in the background; progress is reported through
    /// [`subscribe`](Self::subscribe) and [`status`](Self::status).
    pub fn run(&self, bundle: &Bundle) -> Option<RunId> {
        let mut inner = self.shared.lock();
        let Some(run_id) = inner.state.start() else {
            tracing::info!("already running, ignoring run request");
            return None;
        };

        let request = RunRequest::from(bundle);
        let url = self.config.compile_url();
        tracing::info!(%run_id, %url, files = request.files.len(), "starting run");

        if let Some(previous) = inner.transport.take() {
            previous.abort();
        }
        let task = self.runtime.spawn(transport::drive(
            Arc::clone(&self.shared),
            self.http.clone(),
            url,
            request,
            run_id,
            self.config.heartbeat_timeout,
        ));
        inner.transport = Some(task.abort_handle());
        self.shared.publish(&mut inner);
        Some(run_id)
    }

    /// Stop the current run, keeping its console output.
    ///
    /// Pending callbacks of the run become no-ops and its transport is
    /// aborted.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        tracing::info!(run_id = %inner.state.run_id(), "stopping run");
        inner.state.stop();
        if let Some(transport) = inner.transport.take() {
            transport.abort();
        }
        self.shared.publish(&mut inner);
    }

    /// Stop the current run and clear the console.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        tracing::info!(run_id = %inner.state.run_id(), "resetting");
        inner.state.reset();
        if let Some(transport) = inner.transport.take() {
            transport.abort();
        }
        self.shared.publish(&mut inner);
    }

    /// Subscribe to console updates from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RunUpdate> {
        self.shared.updates.subscribe()
    }

    /// Watch the running/has-run flags.
    pub fn status(&self) -> watch::Receiver<RunStatus> {
        self.shared.status.subscribe()
    }

    pub fn snapshot(&self) -> RunStatus {
        self.shared.lock().state.status()
    }

    /// Copy of the whole console.
    pub fn events(&self) -> Vec<ConsoleEvent> {
        self.shared.lock().state.events().to_vec()
    }

    pub fn is_running(&self) -> bool {
        self.snapshot().running
    }

    /// Resolve once no run is active.
    pub async fn wait_finished(&self) {
        let mut status = self.status();
        // The sender lives as long as `self`
        let _ = status.wait_for(|s| !s.running).await;
    }
}

impl Drop for StreamingRunClient {
    fn drop(&mut self) {
        if let Some(transport) = self.shared.lock().transport.take() {
            transport.abort();
        }
    }
}
