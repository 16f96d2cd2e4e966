//! Playground client - talks to the playground compile and storage backend.
//!
//! # Architecture
//!
//! A run is driven by a [`StreamingRunClient`]. `run()` posts the bundle to
//! `<backend>/compile` and spawns a transport task that reads the
//! newline-delimited JSON response and feeds it into a [`RunState`]. The
//! state machine owns every decision (line splitting, error events,
//! termination); the transport only moves bytes and keeps the heartbeat
//! [`Watchdog`] armed.
//!
//! Every transport callback carries the [`RunId`] it was issued for. Once
//! `stop()`, `reset()` or the end of the run advances the id, late callbacks
//! are ignored.
//!
//! # Usage
//!
//! ```rust,ignore
//! use playground_client::{ClientConfig, RunUpdate, StreamingRunClient};
//!
//! let client = StreamingRunClient::new(ClientConfig::from_env()?)?;
//! let mut updates = client.subscribe();
//! client.run(&bundle);
//!
//! while let Ok(update) = updates.recv().await {
//!     match update {
//!         RunUpdate::Appended { events, .. } => render(&events),
//!         RunUpdate::Finished { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

mod client;
mod config;
mod error;
mod run_state;
mod store;
mod transport;
mod watchdog;

pub use client::StreamingRunClient;
pub use config::{
    ClientConfig, DEFAULT_BACKEND_URL, DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_STORAGE_TIMEOUT,
};
pub use error::ClientError;
pub use run_state::{
    RunId, RunPhase, RunState, RunStatus, RunUpdate, Transition, CONNECT_ERROR_MESSAGE,
    PARSE_ERROR_MESSAGE, RUNNING_MESSAGE, TIMEOUT_MESSAGE,
};
pub use store::{BundleStore, StoreError};
pub use watchdog::Watchdog;

// Re-export the wire types consumers need
pub use playground_api::{Bundle, BundleFile, ConsoleEvent, RunRequest, Stream, StoredBundle};
