//! Response body normalization.
//!
//! The lookup service returns a loosely structured JSON object. Only the
//! outer shape is required; every field inside is optional and falls back to
//! a default when missing or of the wrong type.
//!
//! Accepted field names (current name first, older API name second):
//!
//! | Meaning          | Fields                          |
//! |------------------|---------------------------------|
//! | legacy flag      | `legacy`                        |
//! | submission list  | `submissions`, `verifications`  |
//! | proof link       | `link`, `video_url`             |
//! | submitter object | `submitter`, `submitted_by`     |
//! | display name     | `displayName`, `global_name`    |
//! | handle           | `handle`, `name`                |

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use verifier_core::constants::UNKNOWN_NAME;
use verifier_core::error::{Result, VerifierError};
use verifier_core::types::{LookupKey, VerifierRecord};

const LEGACY_FIELDS: &[&str] = &["legacy"];
const SUBMISSION_FIELDS: &[&str] = &["submissions", "verifications"];
const LINK_FIELDS: &[&str] = &["link", "video_url"];
const SUBMITTER_FIELDS: &[&str] = &["submitter", "submitted_by"];
const DISPLAY_NAME_FIELDS: &[&str] = &["displayName", "global_name"];
const HANDLE_FIELDS: &[&str] = &["handle", "name"];

/// Turns a raw response body into a [`VerifierRecord`].
pub struct RecordParser;

impl RecordParser {
    /// Parses `body` fetched for `key`.
    ///
    /// Fails only when the body is not a JSON object. Every submission credits
    /// a name, `Unknown` when none can be read (including entries that are not
    /// objects). Names are deduplicated (case-sensitive) in first-seen order;
    /// the first non-empty proof link wins.
    pub fn parse(key: &LookupKey, body: &[u8], fetched_at: DateTime<Utc>) -> Result<VerifierRecord> {
        let value: Value = serde_json::from_slice(body).map_err(|e| VerifierError::Parse {
            key: key.wire_path(),
            reason: e.to_string(),
        })?;
        let root = value.as_object().ok_or_else(|| VerifierError::Parse {
            key: key.wire_path(),
            reason: format!("expected a JSON object, got {}", type_name(&value)),
        })?;

        let legacy = field(root, LEGACY_FIELDS)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let submissions = field(root, SUBMISSION_FIELDS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut names: Vec<String> = Vec::new();
        let mut proof_url: Option<String> = None;

        for submission in submissions {
            let submission = submission.as_object();
            if proof_url.is_none() {
                proof_url = submission
                    .and_then(|s| non_empty_str(s, LINK_FIELDS))
                    .map(str::to_string);
            }

            let name = submission.map_or(UNKNOWN_NAME, resolve_name);
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }

        Ok(VerifierRecord::new(key.clone(), names, proof_url, legacy, fetched_at))
    }
}

/// Picks the submitter's display name, then handle, then the placeholder.
fn resolve_name(submission: &Map<String, Value>) -> &str {
    let Some(submitter) = field(submission, SUBMITTER_FIELDS).and_then(Value::as_object) else {
        return UNKNOWN_NAME;
    };
    non_empty_str(submitter, DISPLAY_NAME_FIELDS)
        .or_else(|| non_empty_str(submitter, HANDLE_FIELDS))
        .unwrap_or(UNKNOWN_NAME)
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| object.get(*name).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
