//! Composed resolver: cache, durable copy, coordinator, and remote client.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{error, info, instrument};

use verifier_cache::{CacheStats, CacheStore, PersistenceCodec};
use verifier_core::error::{Result, VerifierError};
use verifier_core::traits::RemoteLookup;
use verifier_core::types::{LookupKey, RemoteResponse, Resolution, VerifierRecord};
use verifier_http::HttpLookup;

use crate::config::ResolverConfig;
use crate::coordinator::FetchCoordinator;

type PendingFetch = Pin<Box<dyn Future<Output = Result<RemoteResponse>> + Send>>;

/// Resolves verification records for lookup keys.
///
/// Owns the single [`CacheStore`] for the process and shares it with the
/// [`FetchCoordinator`]. On open, the durable copy (if configured) is loaded;
/// a missing or corrupt file starts an empty cache.
pub struct VerifierResolver {
    lookup: Arc<dyn RemoteLookup>,
    cache: Arc<CacheStore>,
    codec: Option<Arc<PersistenceCodec>>,
    coordinator: FetchCoordinator,
    config: ResolverConfig,
}

impl VerifierResolver {
    /// Opens a resolver backed by the HTTP lookup client.
    pub async fn open(config: ResolverConfig) -> Result<Self> {
        let lookup = HttpLookup::with_config(config.http())?;
        Self::with_lookup(config, Arc::new(lookup)).await
    }

    /// Opens a resolver backed by a custom remote lookup.
    ///
    /// Must be awaited on a Tokio runtime; fetches are spawned on that runtime
    /// for the life of the resolver.
    #[instrument(skip(config, lookup), fields(cache_dir = ?config.cache_dir))]
    pub async fn with_lookup(config: ResolverConfig, lookup: Arc<dyn RemoteLookup>) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| VerifierError::Config(format!("No Tokio runtime available: {}", e)))?;

        let codec = config
            .cache_dir
            .as_ref()
            .map(|dir| Arc::new(PersistenceCodec::in_dir(dir)));

        let cache = Arc::new(CacheStore::new());
        if let Some(codec) = &codec {
            match codec.load().await {
                Ok(entries) => cache.replace_all(entries),
                Err(e) => error!(error = %e, "Failed to read cache file, starting empty"),
            }
        }

        info!(entries = cache.len(), "Resolver ready");

        Ok(Self {
            lookup,
            coordinator: FetchCoordinator::new(Arc::clone(&cache), codec.clone(), runtime),
            cache,
            codec,
            config,
        })
    }

    /// Resolves `key`, fetching from the remote service on a miss.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn resolve(&self, key: LookupKey) -> Resolution {
        let fetch = self.fetch_fn(&key);
        self.coordinator.resolve_async(key, fetch).await
    }

    /// Resolves `key` and reports the outcome to `on_complete`.
    ///
    /// Callable from any thread, including ones outside the runtime.
    /// `on_complete` may run on a runtime worker thread; callers bound to a
    /// single thread must hand the result back themselves (e.g. via a channel).
    pub fn resolve_with<C>(&self, key: LookupKey, on_complete: C)
    where
        C: FnOnce(Resolution) + Send + 'static,
    {
        let fetch = self.fetch_fn(&key);
        self.coordinator.resolve(key, fetch, on_complete);
    }

    fn fetch_fn(&self, key: &LookupKey) -> impl Send + 'static + FnOnce() -> PendingFetch {
        let lookup = Arc::clone(&self.lookup);
        let path = key.wire_path();
        move || -> PendingFetch { Box::pin(async move { lookup.get(&path).await }) }
    }

    /// Returns the cached record for `key` without fetching.
    pub fn cached(&self, key: &LookupKey) -> Option<VerifierRecord> {
        self.cache.lookup(key)
    }

    /// Drops every cached record and deletes the durable copy.
    ///
    /// Fetches still in flight may repopulate the cache when they complete.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear();
        if let Some(codec) = &self.codec {
            codec.remove().await?;
        }
        info!("Cache cleared");
        Ok(())
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns every cached record, expired ones included.
    pub fn entries(&self) -> Vec<VerifierRecord> {
        let mut entries: Vec<_> = self.cache.snapshot().into_values().collect();
        entries.sort_by_key(|record| record.key.wire_path());
        entries
    }

    /// Returns the durable cache file path, if persistence is enabled.
    pub fn cache_path(&self) -> Option<&Path> {
        self.codec.as_deref().map(PersistenceCodec::path)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }
}
