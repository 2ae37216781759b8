//! Lookup keys.
//!
//! Items are identified by an opaque base identifier plus a variant. The
//! string suffix form (`"1000_2p"`) only exists at the network and file
//! boundaries; everywhere else the compound key is used.
//!
//! The wire form must map back to exactly one key, and must be usable as a
//! single URL path segment. A base identifier therefore may not end with the
//! two-player suffix, may not be `.` or `..`, and may not contain `/`, `?`,
//! `#`, or control characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::TWO_PLAYER_SUFFIX;
use crate::error::{Result, VerifierError};

/// Alternate mode of the same underlying item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The item itself.
    #[default]
    Standard,
    /// Two-player mode of the item.
    TwoPlayer,
}

/// Key identifying one lookup target and its variant.
///
/// Serializes as its wire form; deserialization goes through [`FromStr`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LookupKey {
    base: String,
    variant: Variant,
}

impl LookupKey {
    /// Creates a key, rejecting base identifiers with no unambiguous wire form.
    pub fn new(base: impl Into<String>, variant: Variant) -> Result<Self> {
        let base = base.into().trim().to_string();
        validate_base(&base)?;
        Ok(Self { base, variant })
    }

    /// Creates a standard-variant key.
    pub fn standard(base: impl Into<String>) -> Result<Self> {
        Self::new(base, Variant::Standard)
    }

    /// Creates a two-player-variant key.
    pub fn two_player(base: impl Into<String>) -> Result<Self> {
        Self::new(base, Variant::TwoPlayer)
    }

    /// Returns the base identifier.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the variant.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Formats the key for the remote path and the durable cache file.
    pub fn wire_path(&self) -> String {
        match self.variant {
            Variant::Standard => self.base.clone(),
            Variant::TwoPlayer => format!("{}{}", self.base, TWO_PLAYER_SUFFIX),
        }
    }
}

fn validate_base(base: &str) -> Result<()> {
    if base.is_empty() {
        return Err(VerifierError::InvalidKey("base identifier cannot be empty".into()));
    }
    if base == "." || base == ".." {
        return Err(VerifierError::InvalidKey(format!(
            "base identifier cannot be a relative path segment: {}",
            base
        )));
    }
    if let Some(c) = base.chars().find(|c| matches!(c, '/' | '?' | '#') || c.is_control()) {
        return Err(VerifierError::InvalidKey(format!(
            "base identifier cannot contain {:?}: {}",
            c, base
        )));
    }
    if base.ends_with(TWO_PLAYER_SUFFIX) {
        return Err(VerifierError::InvalidKey(format!(
            "base identifier cannot end with {}: {}",
            TWO_PLAYER_SUFFIX, base
        )));
    }
    Ok(())
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_path())
    }
}

impl FromStr for LookupKey {
    type Err = VerifierError;

    /// Parses the wire form produced by [`LookupKey::wire_path`].
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.strip_suffix(TWO_PLAYER_SUFFIX) {
            Some(base) => Self::new(base, Variant::TwoPlayer),
            None => Self::new(s, Variant::Standard),
        }
    }
}

impl TryFrom<String> for LookupKey {
    type Error = VerifierError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<LookupKey> for String {
    fn from(key: LookupKey) -> Self {
        key.wire_path()
    }
}
