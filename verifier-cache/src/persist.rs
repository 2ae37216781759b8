//! Durable JSON copy of the record cache.
//!
//! The whole store is written as one JSON object keyed by wire key:
//!
//! ```text
//! {
//!   "1000":    { "names": ["Foo"], "proof_url": "https://...", "legacy": false, "fetched_at": 1718000000 },
//!   "1000_2p": { "names": [],      "proof_url": "",            "legacy": false, "fetched_at": 1718000100 }
//! }
//! ```
//!
//! Names are stored as the full list, not the joined display string.
//! Timestamps are whole seconds since the Unix epoch.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use verifier_core::constants::CACHE_FILE_NAME;
use verifier_core::error::Result;
use verifier_core::types::{LookupKey, VerifierRecord};

use crate::CacheStore;

/// On-disk shape of a single record.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    names: Vec<String>,
    #[serde(default)]
    proof_url: String,
    #[serde(default)]
    legacy: bool,
    fetched_at: i64,
}

impl From<&VerifierRecord> for StoredRecord {
    fn from(record: &VerifierRecord) -> Self {
        Self {
            names: record.names.clone(),
            proof_url: record.proof_url.clone().unwrap_or_default(),
            legacy: record.legacy,
            fetched_at: record.fetched_at.timestamp(),
        }
    }
}

impl StoredRecord {
    fn into_record(self, key: LookupKey) -> Option<VerifierRecord> {
        let fetched_at = DateTime::from_timestamp(self.fetched_at, 0)?;
        Some(VerifierRecord::new(
            key,
            self.names,
            Some(self.proof_url),
            self.legacy,
            fetched_at,
        ))
    }
}

/// Reads and writes the durable cache file.
///
/// Saves go to a temporary sibling file which is synced and then renamed over
/// the durable path, so a crash mid-save leaves the previous copy intact.
/// Concurrent saves are serialized.
pub struct PersistenceCodec {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PersistenceCodec {
    /// Creates a codec for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a codec for the default cache file inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CACHE_FILE_NAME))
    }

    /// Returns the durable file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `snapshot` as the new durable copy.
    #[instrument(skip(self, snapshot), fields(path = ?self.path))]
    pub async fn save(&self, snapshot: &HashMap<LookupKey, VerifierRecord>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_snapshot(snapshot).await
    }

    /// Snapshots `cache` and writes it.
    ///
    /// The snapshot is taken after acquiring the write lock, so the file always
    /// ends up reflecting the newest cache state among concurrent callers.
    pub async fn persist(&self, cache: &CacheStore) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let snapshot = cache.snapshot();
        self.write_snapshot(&snapshot).await
    }

    async fn write_snapshot(&self, snapshot: &HashMap<LookupKey, VerifierRecord>) -> Result<()> {
        let stored: BTreeMap<String, StoredRecord> = snapshot
            .iter()
            .map(|(key, record)| (key.wire_path(), StoredRecord::from(record)))
            .collect();
        let contents = serde_json::to_vec_pretty(&stored)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;

        debug!(count = stored.len(), "Cache saved");
        Ok(())
    }

    /// Loads the durable copy.
    ///
    /// A missing file yields an empty map. A malformed file also yields an
    /// empty map and logs a warning; individual bad entries are skipped.
    /// Other I/O failures are returned.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn load(&self) -> Result<HashMap<LookupKey, VerifierRecord>> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache file, starting empty");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let raw: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(&contents) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Cache file is malformed, ignoring it");
                return Ok(HashMap::new());
            }
        };

        let mut entries = HashMap::with_capacity(raw.len());
        for (wire_key, value) in raw {
            let key = match wire_key.parse::<LookupKey>() {
                Ok(key) => key,
                Err(e) => {
                    warn!(key = %wire_key, error = %e, "Skipping cache entry with bad key");
                    continue;
                }
            };
            let record = serde_json::from_value::<StoredRecord>(value)
                .ok()
                .and_then(|stored| stored.into_record(key.clone()));
            match record {
                Some(record) => {
                    entries.insert(key, record);
                }
                None => warn!(key = %wire_key, "Skipping malformed cache entry"),
            }
        }

        info!(count = entries.len(), "Loaded cache from disk");
        Ok(entries)
    }

    /// Deletes the durable copy. A missing file is not an error.
    pub async fn remove(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = ?self.path, "Removed cache file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
