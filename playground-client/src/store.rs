//! Bundle storage client (`/load` and `/save`).

use playground_api::{Bundle, StorageResponse, StoredBundle};
use reqwest::header::ACCEPT;

use crate::{ClientConfig, ClientError};

/// Errors from load and save requests. Messages are shown to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot load blank id")]
    BlankId,

    #[error("request timed out")]
    Timeout,

    #[error("error connecting to server: {0}")]
    Connect(reqwest::Error),

    /// The server explained the failure in its `Error` field.
    #[error("error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("error {status}: unknown")]
    Status { status: u16 },

    #[error("invalid response format")]
    InvalidFormat,

    #[error("error parsing Data: {data}\n{source}")]
    Data {
        data: String,
        source: serde_json::Error,
    },
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Connect(err)
        }
    }
}

/// Loads and saves bundles by id.
#[derive(Clone)]
pub struct BundleStore {
    config: ClientConfig,
    http: reqwest::Client,
}

impl BundleStore {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_http(config, http))
    }

    pub fn with_http(config: ClientConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Fetch the bundle stored under `id`.
    pub async fn load(&self, id: &str) -> Result<StoredBundle, StoreError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(StoreError::BlankId);
        }
        tracing::info!(id, "loading bundle");
        let response = self
            .http
            .get(self.config.load_url(id))
            .header(ACCEPT, "application/json")
            .timeout(self.config.storage_timeout)
            .send()
            .await?;
        self.read_response(response).await
    }

    /// Store `bundle` and return it with its new id.
    pub async fn save(&self, bundle: &Bundle) -> Result<StoredBundle, StoreError> {
        tracing::info!(files = bundle.files.len(), "saving bundle");
        let response = self
            .http
            .post(self.config.save_url())
            .header(ACCEPT, "application/json")
            .json(bundle)
            .timeout(self.config.storage_timeout)
            .send()
            .await?;
        self.read_response(response).await
    }

    async fn read_response(&self, response: reqwest::Response) -> Result<StoredBundle, StoreError> {
        let status = response.status();
        let body = response.bytes().await?;
        // A body that is not a storage response is judged by its status below
        let parsed: StorageResponse = serde_json::from_slice(&body).unwrap_or_default();
        let stored = interpret(status.as_u16(), status.is_success(), parsed);
        match &stored {
            Ok(stored) => tracing::info!(id = %stored.id, "storage request succeeded"),
            Err(err) => tracing::warn!(status = status.as_u16(), "storage request failed: {}", err),
        }
        stored
    }
}

/// Turn a storage response into a bundle, checking the fields in the order
/// the server can fail them.
fn interpret(status: u16, ok: bool, response: StorageResponse) -> Result<StoredBundle, StoreError> {
    if let Some(message) = response.error.filter(|e| !e.is_empty()) {
        return Err(StoreError::Server { status, message });
    }
    if !ok {
        return Err(StoreError::Status { status });
    }
    let (Some(link), Some(data)) = (
        response.link.filter(|l| !l.is_empty()),
        response.data.filter(|d| !d.is_empty()),
    ) else {
        return Err(StoreError::InvalidFormat);
    };
    match Bundle::from_json(&data) {
        Ok(bundle) => Ok(StoredBundle { id: link, bundle }),
        Err(source) => Err(StoreError::Data { data, source }),
    }
}
