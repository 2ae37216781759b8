//! HTTP client for the verifier lookup service.
//!
//! Issues `GET {base_url}/{key}` and hands back the raw status and body;
//! interpreting them is the resolver's job.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod client;

pub use client::{HttpLookup, HttpLookupConfig};
