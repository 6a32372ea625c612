//! An RFC 7234 HTTP/1.1 caching layer that sits between an HTTP client
//! application and an origin-facing transport.
//!
//! The cache decides whether a request can be satisfied from a local store,
//! serves stored responses while they are valid, conditionally revalidates
//! stale entries with the origin (synchronously, or in the background for
//! `stale-while-revalidate`), and updates or invalidates stored entries in
//! response to server traffic. Responses it returns are equivalent to what a
//! non-caching client would observe, apart from added `Age`/`Warning`
//! headers and the diagnostic [`XCACHE`]/[`XCACHELOOKUP`] headers.
//!
//! The cache is transparent on failure: storage and scheduling problems
//! degrade to pass-through and the caller still gets a correct response.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_client_cache::{
//!     Backend, CacheConfig, HeapResourceFactory, HttpCache, InMemoryStorage, Result,
//! };
//!
//! struct Origin;
//!
//! #[async_trait]
//! impl Backend for Origin {
//!     async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
//!         // ... perform `request` with your HTTP client of choice ...
//!         # let _ = request;
//!         Ok(Response::builder().status(200).body(Bytes::from_static(b"hello"))?)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = HttpCache::new(
//!         Origin,
//!         Arc::new(InMemoryStorage::new(1000)),
//!         Arc::new(HeapResourceFactory),
//!         CacheConfig::default(),
//!     );
//!     let response = cache.execute(Request::get("http://example.com/").body(Bytes::new())?).await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `storage-cacache` (default): enable [cacache](https://github.com/zkat/cacache-rs),
//! a high-performance disk cache, as a persistent storage backend.
#![forbid(unsafe_code, future_incompatible)]
#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]

use std::fmt;

mod cache_control;
mod conditional;
mod config;
mod entry;
mod error;
mod executor;
mod failure;
mod freshness;
mod invalidate;
mod keys;
mod policy;
mod resource;
mod serialize;
mod storage;
mod suitability;
mod update;
mod validator;

pub use cache_control::{CacheControl, MaxStale};
pub use conditional::ConditionalRequestBuilder;
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use executor::{Backend, HttpCache};
pub use failure::FailureCache;
pub use freshness::FreshnessCalculator;
pub use invalidate::CacheInvalidator;
pub use keys::{primary_key, request_url, variant_key, variant_storage_key};
pub use policy::{RequestPolicy, ResponseCachingPolicy};
pub use resource::{ByteStream, FileResourceFactory, HeapResourceFactory, Resource, ResourceFactory};
pub use serialize::EntrySerializer;
pub use storage::{EntryTransformer, InMemoryStorage, Storage};
pub use suitability::{Suitability, SuitabilityChecker};
pub use update::CacheEntryUpdater;
pub use validator::{AsyncValidator, BackoffScheduler};

#[cfg(feature = "storage-cacache")]
pub use serialize::BincodeEntrySerializer;

#[cfg(feature = "storage-cacache")]
pub use storage::CacacheStorage;

// Custom headers used to indicate cache status (hit or miss)
/// `x-cache` header: HIT if the response was served from cache, MISS if not
pub const XCACHE: &str = "x-cache";
/// `x-cache-lookup` header: HIT if a response existed in cache, MISS if not
pub const XCACHELOOKUP: &str = "x-cache-lookup";

/// Represents a basic cache status
/// Used in the custom headers `x-cache` and `x-cache-lookup`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HitOrMiss {
    /// Yes, there was a hit
    HIT,
    /// No, there was no hit
    MISS,
}

impl fmt::Display for HitOrMiss {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::HIT => write!(f, "HIT"),
            Self::MISS => write!(f, "MISS"),
        }
    }
}
