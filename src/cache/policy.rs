//! Cache Policy Module
//!
//! Pure eligibility decisions for static responses: on/off switch,
//! extension allow-list, skip-path substrings and size cap.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

/// Directory used when the configured one is empty
pub const FALLBACK_CACHE_DIR: &str = "./cache";

/// Extensions cached by default
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".html", ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".woff", ".woff2", ".ttf",
    ".eot",
];

// == Policy Config ==
/// Static cache settings for one proxy rule. Read-only once the policy is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicyConfig {
    /// Whether static caching is enabled at all
    pub enabled: bool,
    /// Server-side lifetime of an entry in seconds
    pub ttl_secs: u64,
    /// Largest cacheable body in bytes, `<= 0` means unlimited
    pub max_file_size: i64,
    /// Allowed extensions including the dot, compared case-insensitively
    pub file_extensions: Vec<String>,
    /// Paths containing any of these substrings are never cached
    pub skip_subpaths: Vec<String>,
    /// Directory holding the cached artifacts
    pub cache_dir: PathBuf,
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 3600,
            max_file_size: 25 * 1024 * 1024,
            file_extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            skip_subpaths: Vec::new(),
            cache_dir: PathBuf::from(FALLBACK_CACHE_DIR),
        }
    }
}

// == Cache Policy ==
/// Decides which request paths and bodies may be cached.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    config: CachePolicyConfig,
}

impl CachePolicy {
    // == Constructor ==
    /// Builds the policy and creates the storage directory if it is missing.
    ///
    /// Creation is idempotent, so building twice over the same directory
    /// keeps whatever artifacts already live there.
    pub fn new(config: CachePolicyConfig) -> Result<Self> {
        if !config.cache_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&config.cache_dir)?;
        }

        info!(
            "Static cache policy: enabled={}, ttl={}s, max_file_size={}, dir={:?}",
            config.enabled, config.ttl_secs, config.max_file_size, config.cache_dir
        );

        Ok(Self { config })
    }

    /// Global on/off switch.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &CachePolicyConfig {
        &self.config
    }

    /// Directory artifacts are written to.
    pub fn storage_dir(&self) -> &Path {
        if self.config.cache_dir.as_os_str().is_empty() {
            Path::new(FALLBACK_CACHE_DIR)
        } else {
            &self.config.cache_dir
        }
    }

    // == Should Cache ==
    /// Checks whether a request path is eligible for caching.
    ///
    /// Skip substrings win over the extension allow-list. A path without an
    /// extension never matches.
    pub fn should_cache(&self, request_path: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        if let Some(skip) = self
            .config
            .skip_subpaths
            .iter()
            .find(|skip| request_path.contains(skip.as_str()))
        {
            debug!("Not caching {}: matches skip path {:?}", request_path, skip);
            return false;
        }

        let ext = path_extension(request_path);
        if ext.is_empty() {
            return false;
        }

        self.config
            .file_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    // == Size Limit ==
    /// Checks a body length against the configured cap.
    pub fn fits_size_limit(&self, content_length: i64) -> bool {
        self.config.max_file_size <= 0 || content_length <= self.config.max_file_size
    }
}

/// Returns the extension of the last path segment, dot included.
///
/// `"/a/app.min.js"` gives `".js"`, `"/a.b/c"` gives `""`.
pub fn path_extension(path: &str) -> &str {
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment.rfind('.').map_or("", |dot| &segment[dot..])
}
