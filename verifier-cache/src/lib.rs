//! Record cache for verifier lookups.
//!
//! - [`CacheStore`]: thread-safe in-memory map with read-time expiry of
//!   negative entries
//! - [`PersistenceCodec`]: durable JSON copy of the whole store, replaced
//!   atomically on every save

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod persist;
mod store;

pub use persist::PersistenceCodec;
pub use store::{CacheStats, CacheStore};
