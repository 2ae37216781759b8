//! Resolver configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use verifier_core::constants::{DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use verifier_core::error::Result;
use verifier_http::HttpLookupConfig;

/// Resolver configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Lookup service base URL
    pub base_url: String,
    /// `User-Agent` sent with lookups
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Directory holding the durable cache file; `None` keeps the cache in memory only
    pub cache_dir: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            cache_dir: None,
        }
    }
}

impl ResolverConfig {
    /// Loads configuration from the environment (and `.env`, if present).
    ///
    /// | Variable                | Field             |
    /// |-------------------------|-------------------|
    /// | `VERIFIER_API_URL`      | `base_url`        |
    /// | `VERIFIER_USER_AGENT`   | `user_agent`      |
    /// | `VERIFIER_TIMEOUT_SECS` | `timeout_seconds` |
    /// | `VERIFIER_CACHE_DIR`    | `cache_dir`       |
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let timeout_seconds = match var("VERIFIER_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Ignoring invalid VERIFIER_TIMEOUT_SECS");
                defaults.timeout_seconds
            }),
            None => defaults.timeout_seconds,
        };

        Self {
            base_url: var("VERIFIER_API_URL").unwrap_or(defaults.base_url),
            user_agent: var("VERIFIER_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout_seconds,
            cache_dir: var("VERIFIER_CACHE_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Sets the lookup service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enables the durable cache file inside `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Keeps the cache in memory only.
    pub fn no_persistence(mut self) -> Self {
        self.cache_dir = None;
        self
    }

    /// Returns the HTTP client part of the configuration.
    pub fn http(&self) -> HttpLookupConfig {
        HttpLookupConfig {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout_seconds: self.timeout_seconds,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.http().validate()
    }
}
