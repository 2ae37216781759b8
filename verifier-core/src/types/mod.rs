//! Domain types for verifier lookups.
//!
//! - [`LookupKey`]: base identifier plus [`Variant`], formatted to a wire path
//! - [`VerifierRecord`]: credited names, proof link, and legacy flag
//! - [`Resolution`]: what a caller observes after a lookup
//! - [`RemoteResponse`]: status and body from the remote service

mod key;
mod record;

pub use key::*;
pub use record::*;
