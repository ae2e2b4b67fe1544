//! Cache Store Module
//!
//! Concurrent index from normalized request path to on-disk artifact, plus
//! the read/write/evict operations that keep index and disk in step.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::{header, HeaderValue};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CachePolicy, CacheStats, ResponseSink};
use crate::error::{CacheError, Result};

/// Cache-Control sent with every served artifact, independent of the server-side TTL
pub const BROWSER_CACHE_CONTROL: &str = "public, max-age=3600";

// == Cache Store ==
/// Disk-backed static response cache for one proxy rule.
///
/// Share it behind an `Arc`; every method takes `&self`. An entry is either
/// absent from the index or present with its artifact written to disk.
#[derive(Debug)]
pub struct CacheStore {
    /// Eligibility rules and storage settings
    policy: CachePolicy,
    /// Normalized key to entry
    entries: DashMap<String, CacheEntry>,
    /// Hit/miss/store/expiry counters
    stats: StatsRecorder,
    /// Suffix source for temporary artifact names
    write_seq: AtomicU64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store. Artifacts left on disk by an earlier process
    /// are not indexed.
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: DashMap::new(),
            stats: StatsRecorder::default(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    // == Key Derivation ==
    /// Strips exactly one leading `/` from the request path.
    pub fn normalize_key(request_path: &str) -> &str {
        request_path.strip_prefix('/').unwrap_or(request_path)
    }

    /// Flattens a key into a file name by replacing path separators with `_`.
    ///
    /// Not injective: `a/b` and `a_b` share an artifact name.
    pub fn artifact_name(key: &str) -> String {
        key.replace(['/', '\\'], "_")
    }

    // == Lookup ==
    /// Returns the fresh entry for a request path, if any.
    pub async fn lookup(&self, request_path: &str) -> Option<CacheEntry> {
        self.lookup_at(request_path, Utc::now()).await
    }

    /// Lookup evaluated at `now`.
    ///
    /// A stale entry is reported as missing and removed together with its
    /// artifact. Failing to delete the artifact is not reported.
    pub async fn lookup_at(&self, request_path: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let key = Self::normalize_key(request_path);

        let entry = match self.entries.get(key) {
            Some(found) => found.value().clone(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if entry.is_expired_at(now) {
            if self.evict_if_stale(key, now) {
                debug!("Cache entry expired: {}", key);
                self.stats.record_expirations(1);
            }
            self.stats.record_miss();
            return None;
        }

        debug!("Cache hit for {} ({}s left)", key, entry.ttl_remaining_at(now));
        self.stats.record_hit();
        Some(entry)
    }

    // == Store ==
    /// Persists a response body and indexes it under the request path.
    ///
    /// The index is only touched once the artifact is fully on disk, so a
    /// failed write leaves any previous entry and its artifact intact.
    pub async fn store(
        &self,
        request_path: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<CacheEntry> {
        let key = Self::normalize_key(request_path);
        if key.is_empty() {
            return Err(CacheError::InvalidKey(request_path.to_string()));
        }

        let dir = self.policy.storage_dir();
        fs::create_dir_all(dir).await?;

        let artifact_path = dir.join(Self::artifact_name(key));
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = dir.join(format!(".tmp-{}-{}", std::process::id(), seq));

        if let Err(e) = fs::write(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let entry = CacheEntry::new(
            key,
            artifact_path,
            content_type,
            Utc::now(),
            self.policy.config().ttl_secs,
        );

        // Rename and insert under the key's entry lock; eviction holds the
        // same lock while it deletes the artifact
        let published = {
            let slot = self.entries.entry(key.to_string());
            std::fs::rename(&temp_path, &entry.artifact_path).map(|()| {
                slot.insert(entry.clone());
            })
        };
        if let Err(e) = published {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        self.stats.record_store();

        debug!(
            "Cached {} ({} bytes) at {:?}",
            key,
            content.len(),
            entry.artifact_path
        );
        Ok(entry)
    }

    // == Serve ==
    /// Streams an entry's artifact into a response sink.
    ///
    /// Sets `Content-Type` (recorded, else inferred from the artifact
    /// extension, else omitted) and a one hour public `Cache-Control`.
    /// Returns the number of body bytes written.
    pub async fn serve<S>(&self, sink: &mut S, entry: &CacheEntry) -> Result<u64>
    where
        S: ResponseSink + ?Sized,
    {
        let mut file = File::open(&entry.artifact_path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CacheError::ArtifactMissing(entry.artifact_path.clone())
            } else {
                CacheError::Io(e)
            }
        })?;

        let headers = sink.headers_mut();
        if let Some(content_type) = content_type_header(entry) {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(BROWSER_CACHE_CONTROL),
        );

        let written = tokio::io::copy(&mut file, sink).await?;
        sink.flush().await?;

        debug!("Served {} ({} bytes) from cache", entry.key, written);
        Ok(written)
    }

    // == Sweep ==
    /// Removes every entry that is stale now. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep against a single snapshot of `now`.
    ///
    /// Entries stored concurrently with the sweep are left alone unless they
    /// are themselves stale at `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut count = 0;
        for key in &expired_keys {
            if self.evict_if_stale(key, now) {
                count += 1;
            }
            tokio::task::yield_now().await;
        }

        if count > 0 {
            self.stats.record_expirations(count as u64);
            info!("Swept {} expired static cache entries", count);
        }
        count
    }

    /// Deletes the artifact and drops the entry for `key` if it is stale at
    /// `now`, holding the key's entry lock throughout.
    fn evict_if_stale(&self, key: &str, now: DateTime<Utc>) -> bool {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) if occupied.get().is_expired_at(now) => {
                remove_artifact(&occupied.get().artifact_path);
                occupied.remove();
                true
            }
            _ => false,
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    /// Returns the current number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Best-effort artifact deletion. An orphan file is the worst outcome.
fn remove_artifact(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove cached artifact {:?}: {}", path, e);
        }
    }
}

fn content_type_header(entry: &CacheEntry) -> Option<HeaderValue> {
    if !entry.content_type.is_empty() {
        match HeaderValue::from_str(&entry.content_type) {
            Ok(value) => return Some(value),
            Err(_) => warn!(
                "Ignoring invalid recorded content type {:?} for {}",
                entry.content_type, entry.key
            ),
        }
    }

    mime_guess::from_path(&entry.artifact_path)
        .first()
        .and_then(|mime| HeaderValue::from_str(mime.as_ref()).ok())
}
