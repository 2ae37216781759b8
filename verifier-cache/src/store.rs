//! In-memory record store with expiry-aware reads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use verifier_core::types::{LookupKey, VerifierRecord};

/// Thread-safe map from lookup key to verification record.
///
/// Readers share the lock; writers are exclusive. No method performs I/O
/// while holding the lock.
///
/// Expiry is a read-time policy: a negative entry older than
/// [`NEGATIVE_ENTRY_TTL`](verifier_core::NEGATIVE_ENTRY_TTL) is reported as a
/// miss by [`lookup`](Self::lookup) but stays in the map until the next
/// [`store`](Self::store) for that key overwrites it.
#[derive(Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<LookupKey, VerifierRecord>>,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `entries` (e.g. loaded from disk).
    pub fn with_entries(entries: HashMap<LookupKey, VerifierRecord>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns the record for `key` if present and not expired.
    pub fn lookup(&self, key: &LookupKey) -> Option<VerifierRecord> {
        self.lookup_at(key, Utc::now())
    }

    /// Same as [`lookup`](Self::lookup), evaluating expiry at `now`.
    pub fn lookup_at(&self, key: &LookupKey, now: DateTime<Utc>) -> Option<VerifierRecord> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|record| !record.is_expired_at(now))
            .cloned()
    }

    /// Inserts or replaces the record under its own key.
    pub fn store(&self, record: VerifierRecord) {
        self.entries.write().insert(record.key.clone(), record);
    }

    /// Returns a consistent copy of every entry, expired ones included.
    pub fn snapshot(&self) -> HashMap<LookupKey, VerifierRecord> {
        self.entries.read().clone()
    }

    /// Replaces the whole contents with `entries`.
    pub fn replace_all(&self, entries: HashMap<LookupKey, VerifierRecord>) {
        *self.entries.write() = entries;
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics evaluated at the current time.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let entries = self.entries.read();
        let negative = entries.values().filter(|r| r.is_negative()).count();
        let expired = entries.values().filter(|r| r.is_expired_at(now)).count();

        CacheStats {
            total_entries: entries.len(),
            positive_entries: entries.len() - negative,
            negative_entries: negative,
            expired_entries: expired,
        }
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    /// Total entries (including expired)
    pub total_entries: usize,
    /// Entries with at least one credited name
    pub positive_entries: usize,
    /// Entries with no credited names
    pub negative_entries: usize,
    /// Negative entries past the expiry window
    pub expired_entries: usize,
}
