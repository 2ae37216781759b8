//! # Verifier Core
//!
//! Core types, errors, and traits shared by the verifier lookup crates.
//!
//! - **Types**: lookup keys, verification records, and resolution outcomes
//! - **Errors**: a single error enum with recoverability classification
//! - **Constants**: expiry windows, defaults, and file names
//! - **Traits**: the remote lookup seam
//!
//! ## Example
//!
//! ```rust
//! use verifier_core::{LookupKey, Variant, VerifierRecord};
//!
//! let key = LookupKey::new("1000", Variant::TwoPlayer).unwrap();
//! assert_eq!(key.wire_path(), "1000_2p");
//!
//! let record = VerifierRecord::not_found(key);
//! assert!(record.is_negative());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{Result, VerifierError};
pub use traits::*;
pub use types::*;
