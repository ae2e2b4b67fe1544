//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries and
//! their artifacts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that sweeps the cache at a fixed interval.
///
/// The store itself never ticks; this task is the scheduler that drives
/// [`CacheStore::sweep`]. Abort the returned handle on shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheStore::new(policy));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<CacheStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting static cache sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.sweep().await;
            if removed == 0 {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePolicy, CachePolicyConfig};
    use tempfile::TempDir;

    fn test_cache(dir: &TempDir, ttl_secs: u64) -> Arc<CacheStore> {
        let policy = CachePolicy::new(CachePolicyConfig {
            enabled: true,
            ttl_secs,
            cache_dir: dir.path().to_path_buf(),
            ..CachePolicyConfig::default()
        })
        .unwrap();
        Arc::new(CacheStore::new(policy))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir, 0);

        let entry = cache.store("/expire_soon.css", "text/css", b"x").await.unwrap();

        let handle = spawn_cleanup_task(cache.clone(), 1);

        // Entry goes stale after its first second, the sweep runs every second
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(cache.is_empty(), "Expired entry should have been swept");
        assert!(!entry.artifact_path.exists());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let dir = TempDir::new().unwrap();
        let cache = test_cache(&dir, 3600);

        cache.store("/long_lived.css", "text/css", b"x").await.unwrap();

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.lookup("/long_lived.css").await.is_some());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let dir = TempDir::new().unwrap();
        let handle = spawn_cleanup_task(test_cache(&dir, 60), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
