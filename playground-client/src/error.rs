//! Errors raised while setting up a client.
//!
//! Failures of a run itself never surface here; they become `syserr`
//! console events.

/// Error types for client construction.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid backend url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("unsupported backend url scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
