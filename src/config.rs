//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::CachePolicyConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Base URL requests are forwarded to on a cache miss
    pub origin_url: String,
    /// Static cache settings for the proxied origin
    pub cache: CachePolicyConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `ORIGIN_URL` - Origin base URL (default: http://127.0.0.1:8080)
    /// - `STATIC_CACHE_ENABLED` - Enable caching (default: false)
    /// - `STATIC_CACHE_TTL` - Entry lifetime in seconds (default: 3600)
    /// - `STATIC_CACHE_MAX_FILE_SIZE` - Size cap in bytes, <= 0 is unlimited (default: 25 MiB)
    /// - `STATIC_CACHE_EXTENSIONS` - Comma separated, e.g. `.css,.js` (default: common static assets)
    /// - `STATIC_CACHE_SKIP_SUBPATHS` - Comma separated substrings never cached (default: none)
    /// - `STATIC_CACHE_DIR` - Artifact directory (default: ./cache)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cache_defaults = defaults.cache;

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            origin_url: env::var("ORIGIN_URL").unwrap_or(defaults.origin_url),
            cache: CachePolicyConfig {
                enabled: parse_var("STATIC_CACHE_ENABLED").unwrap_or(cache_defaults.enabled),
                ttl_secs: parse_var("STATIC_CACHE_TTL").unwrap_or(cache_defaults.ttl_secs),
                max_file_size: parse_var("STATIC_CACHE_MAX_FILE_SIZE")
                    .unwrap_or(cache_defaults.max_file_size),
                file_extensions: list_var("STATIC_CACHE_EXTENSIONS")
                    .unwrap_or(cache_defaults.file_extensions),
                skip_subpaths: list_var("STATIC_CACHE_SKIP_SUBPATHS")
                    .unwrap_or(cache_defaults.skip_subpaths),
                cache_dir: env::var("STATIC_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(cache_defaults.cache_dir),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: 60,
            origin_url: "http://127.0.0.1:8080".to_string(),
            cache: CachePolicyConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Comma separated list, blanks dropped. Unset means "use the default".
fn list_var(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|v| split_list(&v))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
