//! Static Cache - a disk-backed cache for static HTTP response bodies
//!
//! Decides which request paths are cacheable, persists response bodies to
//! disk behind a concurrent in-memory index, and serves later hits straight
//! from disk until their TTL runs out.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheEntry, CachePolicy, CachePolicyConfig, CacheStore};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
