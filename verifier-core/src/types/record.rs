//! Verification records and lookup outcomes.

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use crate::constants::{MAX_CREDITED_NAMES, NAME_JOINER, NEGATIVE_ENTRY_TTL};
use crate::types::LookupKey;

/// Returns the current time truncated to whole seconds.
///
/// Records are persisted at second precision, so stamping them this way keeps
/// a reloaded record equal to the one that was saved.
pub fn record_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Who verified an item, with an optional proof link.
///
/// A record with no names is a *negative entry*: the remote service had no
/// verification for the key. Negative entries go stale after
/// [`NEGATIVE_ENTRY_TTL`]; positive entries never do.
///
/// Serializes for display output only; the durable file has its own format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifierRecord {
    /// Key the record was fetched for
    pub key: LookupKey,
    /// Distinct credited names in first-seen order
    pub names: Vec<String>,
    /// Link to the verification proof, if any
    pub proof_url: Option<String>,
    /// Opaque legacy flag from the remote service
    pub legacy: bool,
    /// When the record was last populated
    pub fetched_at: DateTime<Utc>,
}

impl VerifierRecord {
    /// Creates a record, normalizing an empty proof link to `None`.
    pub fn new(
        key: LookupKey,
        names: Vec<String>,
        proof_url: Option<String>,
        legacy: bool,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            names,
            proof_url: proof_url.filter(|url| !url.is_empty()),
            legacy,
            fetched_at,
        }
    }

    /// Creates a negative record stamped with the current time.
    pub fn not_found(key: LookupKey) -> Self {
        Self::not_found_at(key, record_timestamp())
    }

    /// Creates a negative record stamped with `fetched_at`.
    pub fn not_found_at(key: LookupKey, fetched_at: DateTime<Utc>) -> Self {
        Self::new(key, Vec::new(), None, false, fetched_at)
    }

    /// Returns true if no names were credited.
    pub fn is_negative(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns true if the record is a negative entry older than the expiry window.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_negative() {
            return false;
        }
        // A fetched_at in the future yields a negative age and stays fresh.
        match (now - self.fetched_at).to_std() {
            Ok(age) => age > NEGATIVE_ENTRY_TTL,
            Err(_) => false,
        }
    }

    /// Returns the names shown in the composite display (at most two).
    pub fn credited_names(&self) -> &[String] {
        let end = self.names.len().min(MAX_CREDITED_NAMES);
        &self.names[..end]
    }

    /// Returns the credited display string, e.g. `"A & B"`.
    ///
    /// Only the first two names are joined; any others stay in
    /// [`names`](Self::names) but are not surfaced here.
    pub fn credited_display(&self) -> Option<String> {
        if self.is_negative() {
            None
        } else {
            Some(self.credited_names().join(NAME_JOINER))
        }
    }
}

/// Outcome observed by a caller of the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The item has at least one credited name.
    Verified(VerifierRecord),
    /// The remote service had no verification (or failed); cached as negative.
    NotFound(VerifierRecord),
    /// The fetch produced an unusable body. Nothing was cached; retry later.
    Unavailable,
}

impl Resolution {
    /// Classifies a record as verified or not found.
    pub fn from_record(record: VerifierRecord) -> Self {
        if record.is_negative() {
            Resolution::NotFound(record)
        } else {
            Resolution::Verified(record)
        }
    }

    /// Returns the record, if the outcome carries one.
    pub fn record(&self) -> Option<&VerifierRecord> {
        match self {
            Resolution::Verified(record) | Resolution::NotFound(record) => Some(record),
            Resolution::Unavailable => None,
        }
    }

    /// Returns true for [`Resolution::Verified`].
    pub fn is_verified(&self) -> bool {
        matches!(self, Resolution::Verified(_))
    }
}

/// Raw reply from the remote lookup service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl RemoteResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
