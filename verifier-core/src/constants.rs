//! Constants for verifier lookups.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRY
// ═══════════════════════════════════════════════════════════════════════════════

/// How long a negative entry (no credited names) stays fresh.
///
/// Positive entries never expire.
pub const NEGATIVE_ENTRY_TTL: Duration = Duration::from_secs(30 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// REMOTE LOOKUP
// ═══════════════════════════════════════════════════════════════════════════════

/// Default base URL of the lookup service. Keys are appended as `{base}/{key}`.
pub const DEFAULT_API_BASE_URL: &str = "https://api.aredl.net/v2/api/aredl/levels";

/// Default `User-Agent` header sent with lookups.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS & DISPLAY
// ═══════════════════════════════════════════════════════════════════════════════

/// Wire suffix marking the two-player variant of an item.
pub const TWO_PLAYER_SUFFIX: &str = "_2p";

/// Name used when a submission carries neither a display name nor a handle.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Separator for the composite credited-names display.
pub const NAME_JOINER: &str = " & ";

/// Maximum number of names shown in the composite display.
pub const MAX_CREDITED_NAMES: usize = 2;

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// File name of the durable cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "verifier_cache.json";
