//! Client configuration, built once and handed to the clients.

use std::time::Duration;

use url::Url;

use crate::ClientError;

/// Backend used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "https://staging.v.io/playground";

/// Silence tolerated on a run response before it is abandoned.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(10_500);

/// Timeout for load and save requests.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(1);

const ENV_API_URL: &str = "PLAYGROUND_API_URL";
const ENV_API_DEBUG: &str = "PLAYGROUND_API_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base url of the backend; endpoints are resolved below it.
    pub backend_url: Url,
    /// Ask the compile endpoint for debug output (`?debug=1`).
    pub debug: bool,
    pub heartbeat_timeout: Duration,
    pub storage_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: Url::parse(DEFAULT_BACKEND_URL).expect("default backend url is valid"),
            debug: false,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given backend with default timeouts.
    pub fn new(backend_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            backend_url: parse_backend_url(backend_url)?,
            ..Self::default()
        })
    }

    /// Read `PLAYGROUND_API_URL` and `PLAYGROUND_API_DEBUG`, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = match std::env::var(ENV_API_URL) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim())?,
            _ => Self::default(),
        };
        if let Ok(debug) = std::env::var(ENV_API_DEBUG) {
            config.debug = parse_flag(&debug);
        }
        tracing::debug!(?config, "loaded client config from environment");
        Ok(config)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// `<backend>/compile`, with `?debug=1` in debug mode.
    pub fn compile_url(&self) -> Url {
        let mut url = self.endpoint("compile");
        if self.debug {
            url.query_pairs_mut().append_pair("debug", "1");
        }
        url
    }

    /// `<backend>/load?id=<id>`.
    pub fn load_url(&self, id: &str) -> Url {
        let mut url = self.endpoint("load");
        url.query_pairs_mut().append_pair("id", id);
        url
    }

    /// `<backend>/save`.
    pub fn save_url(&self) -> Url {
        self.endpoint("save")
    }

    fn endpoint(&self, name: &str) -> Url {
        let mut url = self.backend_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        // http(s) urls always have a path, checked in parse_backend_url
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url
    }
}

fn parse_backend_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::UnsupportedScheme(other.to_string())),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
