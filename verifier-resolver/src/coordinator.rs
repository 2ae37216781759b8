//! Fetch coordination: cache check, single-flight fetches, write-through.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use verifier_cache::{CacheStore, PersistenceCodec};
use verifier_core::error::{Result, VerifierError};
use verifier_core::types::{record_timestamp, LookupKey, RemoteResponse, Resolution, VerifierRecord};

use crate::parser::RecordParser;

/// Completion callback for a resolve call.
///
/// May run on any thread: synchronously on the caller's thread for a cache
/// hit, or on the runtime worker that completed the fetch.
pub type Observer = Box<dyn FnOnce(Resolution) + Send + 'static>;

type InFlight = Arc<Mutex<HashMap<LookupKey, Vec<Observer>>>>;

/// Orchestrates cache misses.
///
/// At most one fetch per key is outstanding at any time; concurrent resolves
/// of the same key attach to it and all receive the same [`Resolution`].
/// Distinct keys fetch in parallel.
///
/// Fetches run on the runtime behind the [`Handle`] given at construction, so
/// resolves may be issued from threads outside that runtime.
///
/// A fetch that never completes leaves its key in flight forever, and every
/// later resolve of that key waits on it. Fetch functions must enforce their
/// own timeout.
pub struct FetchCoordinator {
    cache: Arc<CacheStore>,
    codec: Option<Arc<PersistenceCodec>>,
    in_flight: InFlight,
    runtime: Handle,
}

impl FetchCoordinator {
    /// Creates a coordinator writing through to `cache` and, if given, `codec`.
    /// Fetches are spawned on `runtime`.
    pub fn new(cache: Arc<CacheStore>, codec: Option<Arc<PersistenceCodec>>, runtime: Handle) -> Self {
        Self {
            cache,
            codec,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            runtime,
        }
    }

    /// Returns the backing cache.
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Returns the number of keys with a fetch in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Resolves `key`, calling `on_complete` exactly once with the outcome.
    ///
    /// A fresh cache hit calls `on_complete` before returning and never calls
    /// `fetch`. Otherwise the call joins the in-flight fetch for `key`, or
    /// starts one on the coordinator's runtime. The caller need not be on a
    /// runtime thread. `fetch` is dropped unused when joining.
    pub fn resolve<F, Fut, C>(&self, key: LookupKey, fetch: F, on_complete: C)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RemoteResponse>> + Send + 'static,
        C: FnOnce(Resolution) + Send + 'static,
    {
        if let Some(record) = self.cache.lookup(&key) {
            debug!(key = %key, "Cache hit");
            on_complete(Resolution::from_record(record));
            return;
        }

        let observer: Observer = Box::new(on_complete);
        {
            let mut in_flight = self.in_flight.lock();
            if let Some(waiters) = in_flight.get_mut(&key) {
                debug!(key = %key, waiters = waiters.len(), "Joining in-flight fetch");
                waiters.push(observer);
                return;
            }

            // A fetch may have finished between the first lookup and taking
            // the lock; it stores before clearing its marker.
            if let Some(record) = self.cache.lookup(&key) {
                drop(in_flight);
                observer(Resolution::from_record(record));
                return;
            }

            in_flight.insert(key.clone(), vec![observer]);
        }

        debug!(key = %key, "Cache miss, starting fetch");

        let cache = Arc::clone(&self.cache);
        let codec = self.codec.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            // Run the fetch as its own task so a panic inside it still
            // releases the in-flight marker.
            let outcome = match runtime.spawn(fetch()).await {
                Ok(outcome) => outcome,
                Err(e) => Err(VerifierError::Http(format!("fetch task failed: {}", e))),
            };

            let resolution = complete(&key, outcome, &cache, codec.as_deref()).await;

            let waiters = in_flight.lock().remove(&key).unwrap_or_default();
            debug!(key = %key, waiters = waiters.len(), "Notifying observers");
            for waiter in waiters {
                waiter(resolution.clone());
            }
        });
    }

    /// Resolves `key` and awaits the outcome through a channel handoff.
    pub async fn resolve_async<F, Fut>(&self, key: LookupKey, fetch: F) -> Resolution
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RemoteResponse>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.resolve(key, fetch, move |resolution| {
            let _ = tx.send(resolution);
        });
        rx.await.unwrap_or(Resolution::Unavailable)
    }
}

/// Turns a fetch outcome into a resolution, writing through on success.
async fn complete(
    key: &LookupKey,
    outcome: Result<RemoteResponse>,
    cache: &CacheStore,
    codec: Option<&PersistenceCodec>,
) -> Resolution {
    let record = match outcome {
        Err(e) => {
            warn!(key = %key, error = %e, "Lookup failed, caching as not found");
            VerifierRecord::not_found(key.clone())
        }
        Ok(response) if !response.is_success() => {
            info!(key = %key, status = response.status, "Lookup returned no record");
            VerifierRecord::not_found(key.clone())
        }
        Ok(response) => match RecordParser::parse(key, &response.body, record_timestamp()) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding malformed response");
                return Resolution::Unavailable;
            }
        },
    };

    cache.store(record.clone());

    if let Some(codec) = codec {
        if let Err(e) = codec.persist(cache).await {
            error!(key = %key, error = %e, "Failed to save cache");
        }
    }

    Resolution::from_record(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;
    use tokio::sync::{Barrier, Notify};

    const FOO_BODY: &str =
        r#"{"legacy": false, "submissions":[{"link":"http://x","submitter":{"displayName":"Foo"}}]}"#;

    fn key(base: &str) -> LookupKey {
        LookupKey::standard(base).unwrap()
    }

    fn coordinator_with_codec(dir: &std::path::Path) -> (FetchCoordinator, Arc<PersistenceCodec>) {
        let codec = Arc::new(PersistenceCodec::in_dir(dir));
        let coordinator = FetchCoordinator::new(
            Arc::new(CacheStore::new()),
            Some(Arc::clone(&codec)),
            Handle::current(),
        );
        (coordinator, codec)
    }

    fn memory_coordinator() -> FetchCoordinator {
        FetchCoordinator::new(Arc::new(CacheStore::new()), None, Handle::current())
    }

    fn respond(
        status: u16,
        body: &'static str,
    ) -> impl Send + 'static + FnOnce() -> std::future::Ready<Result<RemoteResponse>> {
        move || std::future::ready(Ok(RemoteResponse::new(status, body)))
    }

    async fn failing_fetch() -> Result<RemoteResponse> {
        Err(VerifierError::Http("connection reset".into()))
    }

    async fn exploding_fetch() -> Result<RemoteResponse> {
        panic!("fetch blew up")
    }

    #[tokio::test]
    async fn test_fetch_and_store() {
        let coordinator = memory_coordinator();

        let resolution = coordinator.resolve_async(key("1"), respond(200, FOO_BODY)).await;

        let record = match resolution {
            Resolution::Verified(record) => record,
            other => panic!("unexpected resolution: {:?}", other),
        };
        assert_eq!(record.names, vec!["Foo".to_string()]);
        assert_eq!(record.proof_url.as_deref(), Some("http://x"));
        assert_eq!(coordinator.cache().lookup(&key("1")), Some(record));
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let coordinator = memory_coordinator();
        coordinator.resolve_async(key("1"), respond(200, FOO_BODY)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (tx, rx) = std::sync::mpsc::channel();
        coordinator.resolve(
            key("1"),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok(RemoteResponse::new(500, "")))
            },
            move |resolution| tx.send(resolution).unwrap(),
        );

        // Delivered synchronously, before any await point.
        let resolution = rx.try_recv().unwrap();
        assert!(resolution.is_verified());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_fetch() {
        let coordinator = memory_coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let make_fetch = || {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok::<_, VerifierError>(RemoteResponse::new(200, FOO_BODY))
            }
        };

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        coordinator.resolve(key("1"), make_fetch(), move |r| {
            let _ = tx1.send(r);
        });
        coordinator.resolve(key("1"), make_fetch(), move |r| {
            let _ = tx2.send(r);
        });
        assert_eq!(coordinator.in_flight_count(), 1);

        gate.notify_one();
        let first = rx1.await.unwrap();
        let second = rx2.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(first.is_verified());
        assert_eq!(first, second);
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_resolves_share_one_fetch() {
        const CALLERS: usize = 8;
        let coordinator = Arc::new(memory_coordinator());
        let calls = Arc::new(AtomicUsize::new(0));
        let start = Arc::new(Barrier::new(CALLERS));

        let tasks: Vec<_> = (0..CALLERS)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let calls = Arc::clone(&calls);
                let start = Arc::clone(&start);
                tokio::spawn(async move {
                    start.wait().await;
                    coordinator
                        .resolve_async(key("1"), move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                            Ok::<_, VerifierError>(RemoteResponse::new(200, FOO_BODY))
                        })
                        .await
                })
            })
            .collect();

        let mut resolutions = Vec::with_capacity(CALLERS);
        for task in tasks {
            resolutions.push(task.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(resolutions[0].is_verified());
        assert!(resolutions.iter().all(|r| *r == resolutions[0]));
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_from_thread_outside_runtime() {
        let coordinator = Arc::new(memory_coordinator());
        let (tx, rx) = oneshot::channel();

        let caller = Arc::clone(&coordinator);
        std::thread::spawn(move || {
            caller.resolve(key("1"), respond(200, FOO_BODY), move |r| {
                let _ = tx.send(r);
            });
        })
        .join()
        .unwrap();

        assert!(rx.await.unwrap().is_verified());
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_keys_fetch_in_parallel() {
        let coordinator = memory_coordinator();
        let barrier = Arc::new(Barrier::new(2));

        let make_fetch = || {
            let barrier = Arc::clone(&barrier);
            move || async move {
                // Only passes if both fetches are running at the same time.
                barrier.wait().await;
                Ok::<_, VerifierError>(RemoteResponse::new(200, FOO_BODY))
            }
        };

        let both = async {
            tokio::join!(
                coordinator.resolve_async(key("1"), make_fetch()),
                coordinator.resolve_async(key("2"), make_fetch()),
            )
        };
        let (a, b) = tokio::time::timeout(std::time::Duration::from_secs(5), both)
            .await
            .expect("distinct keys should not serialize");

        assert!(a.is_verified());
        assert!(b.is_verified());
        assert_eq!(coordinator.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_persisted() {
        let dir = tempdir().unwrap();
        let (coordinator, codec) = coordinator_with_codec(dir.path());
        let before = Utc::now() - Duration::seconds(1);

        let resolution = coordinator.resolve_async(key("1000"), respond(404, "")).await;

        let record = match resolution {
            Resolution::NotFound(record) => record,
            other => panic!("unexpected resolution: {:?}", other),
        };
        assert!(record.is_negative());
        assert_eq!(record.proof_url, None);
        assert!(!record.legacy);
        assert!(record.fetched_at >= before && record.fetched_at <= Utc::now());

        let reloaded = codec.load().await.unwrap();
        assert_eq!(reloaded.get(&key("1000")), Some(&record));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_found() {
        let coordinator = memory_coordinator();

        let resolution = coordinator
            .resolve_async(key("1"), failing_fetch)
            .await;

        assert!(matches!(resolution, Resolution::NotFound(_)));
        assert!(coordinator.cache().lookup(&key("1")).is_some());
    }

    #[tokio::test]
    async fn test_panicking_fetch_releases_key() {
        let coordinator = memory_coordinator();

        let resolution = coordinator
            .resolve_async(key("1"), exploding_fetch)
            .await;

        assert!(matches!(resolution, Resolution::NotFound(_)));
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_existing_entry() {
        let dir = tempdir().unwrap();
        let (coordinator, codec) = coordinator_with_codec(dir.path());
        let stale = VerifierRecord::not_found_at(key("1"), Utc::now() - Duration::hours(1));
        coordinator.cache().store(stale.clone());

        let resolution = coordinator.resolve_async(key("1"), respond(200, "<html>oops</html>")).await;

        assert_eq!(resolution, Resolution::Unavailable);
        assert_eq!(coordinator.cache().snapshot().get(&key("1")), Some(&stale));
        assert!(!codec.path().exists());
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_negative_entry_refetched() {
        let coordinator = memory_coordinator();
        coordinator
            .cache()
            .store(VerifierRecord::not_found_at(key("1"), Utc::now() - Duration::minutes(31)));

        let resolution = coordinator.resolve_async(key("1"), respond(200, FOO_BODY)).await;

        assert!(resolution.is_verified());
    }

    #[tokio::test]
    async fn test_fresh_negative_entry_served_from_cache() {
        let coordinator = memory_coordinator();
        let negative = VerifierRecord::not_found_at(key("1"), Utc::now() - Duration::minutes(29));
        coordinator.cache().store(negative.clone());

        let resolution = coordinator.resolve_async(key("1"), respond(200, FOO_BODY)).await;

        assert_eq!(resolution, Resolution::NotFound(negative));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        // A directory where the cache file should be makes the rename fail.
        let blocked = dir.path().join("verifier_cache.json");
        std::fs::create_dir(&blocked).unwrap();
        let codec = Arc::new(PersistenceCodec::new(&blocked));
        let coordinator = FetchCoordinator::new(Arc::new(CacheStore::new()), Some(codec), Handle::current());

        let resolution = coordinator.resolve_async(key("1"), respond(200, FOO_BODY)).await;

        assert!(resolution.is_verified());
        assert!(coordinator.cache().lookup(&key("1")).is_some());
    }
}
