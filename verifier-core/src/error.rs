//! Error types for verifier lookups.
//!
//! One error enum covers the remote, parsing, storage, and configuration
//! layers. None of these are fatal to the resolver: the coordinator turns
//! every failure into a [`Resolution`](crate::types::Resolution).

use thiserror::Error;

/// Result type alias using `VerifierError`.
pub type Result<T> = std::result::Result<T, VerifierError>;

/// Main error type for all verifier operations.
#[derive(Debug, Error)]
pub enum VerifierError {
    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed before a status was received.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request did not complete in time.
    #[error("Request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // RESPONSE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Response body was not a structured object.
    #[error("Malformed response for '{key}': {reason}")]
    Parse {
        /// Wire key the body was fetched for
        key: String,
        /// Why the body was rejected
        reason: String,
    },

    /// Lookup key could not be parsed or was empty.
    #[error("Invalid lookup key: {0}")]
    InvalidKey(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VerifierError {
    /// Returns true if this error is transient (a later retry may succeed).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VerifierError::Http(_) | VerifierError::Timeout { .. } | VerifierError::Parse { .. }
        )
    }

    /// Returns true if this error came from the durable cache layer.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, VerifierError::Io(_) | VerifierError::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VerifierError::Parse {
            key: "1000".into(),
            reason: "expected object".into(),
        };
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("expected object"));
    }

    #[test]
    fn test_error_classification() {
        assert!(VerifierError::Http("reset".into()).is_recoverable());
        assert!(VerifierError::Timeout { seconds: 30 }.is_recoverable());
        assert!(!VerifierError::InvalidKey("".into()).is_recoverable());
        assert!(!VerifierError::Config("bad".into()).is_recoverable());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(VerifierError::from(io).is_storage_error());
        assert!(!VerifierError::Http("x".into()).is_storage_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let result: Result<serde_json::Value> = json_result.map_err(VerifierError::from);
        assert!(matches!(result, Err(VerifierError::Json(_))));
    }
}
