//! Lookup client implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use verifier_core::constants::{DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use verifier_core::error::{Result, VerifierError};
use verifier_core::traits::RemoteLookup;
use verifier_core::types::RemoteResponse;

/// Lookup client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpLookupConfig {
    /// Base URL; keys are appended as `{base_url}/{key}`
    pub base_url: String,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for HttpLookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl HttpLookupConfig {
    /// Creates a config pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Builds the request URL for `path`, appended to the base URL as a
    /// single percent-encoded path segment.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        if path.is_empty() || path == "." || path == ".." {
            return Err(VerifierError::InvalidKey(format!("Not a path segment: {:?}", path)));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| VerifierError::Config(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| VerifierError::Config(format!("Base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(path);
        Ok(url)
    }

    /// Checks that the base URL is an absolute http(s) URL and the timeout is non-zero.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| VerifierError::Config(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(VerifierError::Config(format!(
                "Base URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(VerifierError::Config("Timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

/// HTTP implementation of [`RemoteLookup`].
pub struct HttpLookup {
    config: HttpLookupConfig,
    http_client: reqwest::Client,
}

impl HttpLookup {
    /// Creates a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpLookupConfig::default())
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: HttpLookupConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| VerifierError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &HttpLookupConfig {
        &self.config
    }
}

#[async_trait]
impl RemoteLookup for HttpLookup {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<RemoteResponse> {
        let url = self.config.url_for(path)?;

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                VerifierError::Timeout {
                    seconds: self.config.timeout_seconds,
                }
            } else {
                VerifierError::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            warn!(path, status, "Lookup returned non-success status");
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| VerifierError::Http(e.to_string()))?;

        debug!(path, status, len = body.len(), "Lookup complete");
        Ok(RemoteResponse::new(status, body.to_vec()))
    }
}
