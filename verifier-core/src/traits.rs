//! Common traits for verifier lookups.
//!
//! The remote service sits behind [`RemoteLookup`] so the resolver can be
//! driven by the HTTP client in production and by in-memory fakes in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RemoteResponse;

// ═══════════════════════════════════════════════════════════════════════════════
// REMOTE LOOKUP TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the remote verification lookup service.
///
/// Implementations perform a single GET-style request for `path` (the wire
/// form of a [`LookupKey`](crate::types::LookupKey)) and return the status and
/// raw body. A non-success status is a normal response, not an error; errors
/// are reserved for transport failures.
///
/// Implementations own their timeout behavior and must eventually resolve.
#[async_trait]
pub trait RemoteLookup: Send + Sync {
    /// Fetches the raw record for `path`.
    async fn get(&self, path: &str) -> Result<RemoteResponse>;
}
