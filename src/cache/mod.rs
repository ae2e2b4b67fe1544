//! Cache Module
//!
//! Disk-backed caching of static response bodies with time-based expiry.

mod entry;
mod policy;
mod sink;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use policy::{
    path_extension, CachePolicy, CachePolicyConfig, DEFAULT_EXTENSIONS, FALLBACK_CACHE_DIR,
};
pub use sink::{CachedResponse, ResponseSink};
pub use stats::CacheStats;
pub use store::{CacheStore, BROWSER_CACHE_CONTROL};
