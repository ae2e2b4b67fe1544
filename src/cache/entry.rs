//! Cache Entry Module
//!
//! Defines the index record for one artifact persisted on disk.

use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};

// == Cache Entry ==
/// Index record pointing at one cached response body on disk.
///
/// Entries are immutable once created. Storing the same key again replaces
/// the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Normalized cache key (request path without its leading separator)
    pub key: String,
    /// Location of the persisted body, owned by this entry alone
    pub artifact_path: PathBuf,
    /// MIME type recorded at store time, empty when unknown
    pub content_type: String,
    /// Instant after which the entry is stale
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl_secs` seconds after `now`.
    pub fn new(
        key: impl Into<String>,
        artifact_path: PathBuf,
        content_type: impl Into<String>,
        now: DateTime<Utc>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            key: key.into(),
            artifact_path,
            content_type: content_type.into(),
            expires_at: expiry_after(now, ttl_secs),
        }
    }

    // == Is Expired ==
    /// Checks if the entry is stale at `now`.
    ///
    /// An entry is still fresh at exactly its expiry instant; it becomes
    /// stale strictly after it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    // == Time To Live ==
    /// Returns the lifetime left at `now` in whole seconds, 0 once stale.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.expires_at.signed_duration_since(now);
        u64::try_from(remaining.num_seconds()).unwrap_or(0)
    }
}

/// Adds a TTL to `now`, saturating at the largest representable instant.
fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    TimeDelta::try_seconds(secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
