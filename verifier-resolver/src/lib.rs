//! # Verifier Resolver
//!
//! Resolves verification records for lookup keys, backed by an expiry-aware
//! cache, a durable cache file, and single-flight remote fetches.
//!
//! - [`RecordParser`]: normalizes a loosely structured response body
//! - [`FetchCoordinator`]: cache check, per-key fetch deduplication, write-through
//! - [`VerifierResolver`]: wires the cache, codec, coordinator, and HTTP client
//!
//! ## Example
//!
//! ```rust,ignore
//! use verifier_resolver::{ResolverConfig, VerifierResolver};
//! use verifier_core::{LookupKey, Resolution};
//!
//! let resolver = VerifierResolver::open(ResolverConfig::from_env()).await?;
//! match resolver.resolve(LookupKey::standard("1000")?).await {
//!     Resolution::Verified(record) => println!("{:?}", record.credited_display()),
//!     Resolution::NotFound(_) => println!("not found"),
//!     Resolution::Unavailable => println!("try again later"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod coordinator;
mod parser;
mod resolver;

pub use config::ResolverConfig;
pub use coordinator::{FetchCoordinator, Observer};
pub use parser::RecordParser;
pub use resolver::VerifierResolver;
