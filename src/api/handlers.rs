//! API Handlers
//!
//! The caching reverse-proxy handler plus the cache management endpoints.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use crate::cache::{CachePolicy, CacheStore, CachedResponse, ResponseSink};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, StatsResponse};

/// Response header telling clients whether the body came from the cache
pub const X_CACHE: &str = "x-cache";

/// Largest request body forwarded to the origin
const MAX_FORWARD_BODY: usize = 64 * 1024 * 1024;

/// Headers that only apply to a single connection and are never forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Application state shared across all handlers.
///
/// One cache per origin, shared by reference with every request.
#[derive(Clone)]
pub struct AppState {
    /// Static response cache in front of the origin
    pub cache: Arc<CacheStore>,
    /// Client used for cache misses
    pub client: reqwest::Client,
    /// Origin base URL, without trailing slash
    pub origin_url: Arc<str>,
}

impl AppState {
    /// Creates a new AppState around the given cache store.
    pub fn new(cache: CacheStore, origin_url: &str) -> Self {
        Self {
            cache: Arc::new(cache),
            client: reqwest::Client::new(),
            origin_url: Arc::from(origin_url.trim_end_matches('/')),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the cache policy, which creates the artifact directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let policy = CachePolicy::new(config.cache.clone())?;
        Ok(Self::new(CacheStore::new(policy), &config.origin_url))
    }
}

/// Fallback handler: serves cacheable GETs from the cache, forwards
/// everything else to the origin and caches eligible origin responses.
pub async fn proxy_handler(State(state): State<AppState>, req: Request) -> Result<Response> {
    let path = req.uri().path().to_string();
    let cacheable = req.method() == Method::GET && state.cache.policy().should_cache(&path);

    if cacheable {
        if let Some(entry) = state.cache.lookup(&path).await {
            let mut hit = CachedResponse::new();
            match state.cache.serve(&mut hit, &entry).await {
                Ok(_) => {
                    hit.headers_mut()
                        .insert(X_CACHE, HeaderValue::from_static("HIT"));
                    return Ok(hit.into_response());
                }
                Err(e) => warn!("Cache hit for {} unusable, fetching from origin: {}", path, e),
            }
        }
    }

    let upstream = forward_to_origin(&state, req, cacheable).await?;
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let body = upstream
        .bytes()
        .await
        .map_err(|e| CacheError::Upstream(format!("reading origin body: {}", e)))?;

    if cacheable {
        maybe_store(&state, &path, status, &headers, &body).await;
        headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
    }

    Ok((status, headers, Body::from(body)).into_response())
}

/// Stores a 200 origin response if it fits the size cap. Failures are logged.
async fn maybe_store(
    state: &AppState,
    path: &str,
    status: reqwest::StatusCode,
    headers: &HeaderMap,
    body: &Bytes,
) {
    if status != reqwest::StatusCode::OK {
        debug!("Not caching {}: origin answered {}", path, status);
        return;
    }

    let length = i64::try_from(body.len()).unwrap_or(i64::MAX);
    if !state.cache.policy().fits_size_limit(length) {
        debug!("Not caching {}: {} bytes exceeds size limit", path, length);
        return;
    }

    if !is_identity_encoded(headers) {
        debug!("Not caching {}: body is content-encoded", path);
        return;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Err(e) = state.cache.store(path, content_type, body).await {
        warn!("Failed to cache {}: {}", path, e);
    }
}

/// Sends the request upstream. Cacheable requests ask for an unencoded body,
/// since cache hits are served without `Content-Encoding`.
async fn forward_to_origin(
    state: &AppState,
    req: Request,
    cacheable: bool,
) -> Result<reqwest::Response> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.origin_url, path_and_query);

    let body = axum::body::to_bytes(body, MAX_FORWARD_BODY)
        .await
        .map_err(|e| CacheError::Internal(format!("reading request body: {}", e)))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    if cacheable {
        headers.remove(header::ACCEPT_ENCODING);
    }

    debug!("Forwarding {} {} to origin", parts.method, url);

    state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| CacheError::Upstream(format!("{}: {}", url, e)))
}

fn is_identity_encoded(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .all(|v| v.to_str().is_ok_and(|enc| enc.trim().eq_ignore_ascii_case("identity")))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Handler for GET /_cache/stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    Json(StatsResponse::new(state.cache.policy().is_enabled(), &stats))
}

/// Handler for GET /_cache/health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicyConfig;
    use axum::http::StatusCode;
    use tempfile::TempDir;

    // Nothing listens on port 1, so any origin fetch fails fast
    const DEAD_ORIGIN: &str = "http://127.0.0.1:1";

    fn test_state(dir: &TempDir, enabled: bool) -> AppState {
        let policy = CachePolicy::new(CachePolicyConfig {
            enabled,
            ttl_secs: 60,
            file_extensions: vec![".css".to_string()],
            cache_dir: dir.path().to_path_buf(),
            ..CachePolicyConfig::default()
        })
        .unwrap();
        AppState::new(CacheStore::new(policy), DEAD_ORIGIN)
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_cache_hit_skips_origin() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, true);
        state.cache.store("/app.css", "text/css", b"body{}").await.unwrap();

        let response = proxy_handler(State(state), get("/app.css")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_CACHE], "HIT");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"body{}");
    }

    #[tokio::test]
    async fn test_disabled_cache_goes_to_origin() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, false);
        state.cache.store("/app.css", "text/css", b"body{}").await.unwrap();

        let result = proxy_handler(State(state), get("/app.css")).await;
        assert!(matches!(result, Err(CacheError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_missing_artifact_falls_back_to_origin() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, true);
        let entry = state.cache.store("/app.css", "text/css", b"x").await.unwrap();
        std::fs::remove_file(&entry.artifact_path).unwrap();

        let result = proxy_handler(State(state), get("/app.css")).await;
        assert!(matches!(result, Err(CacheError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_origin_unreachable_is_bad_gateway() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, true);

        let response = proxy_handler(State(state), get("/index.html"))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, true);

        let response = stats_handler(State(state)).await;
        assert!(response.enabled);
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }

    #[test]
    fn test_is_identity_encoded() {
        let mut headers = HeaderMap::new();
        assert!(is_identity_encoded(&headers));

        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("Identity"));
        assert!(is_identity_encoded(&headers));

        headers.append(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        assert!(!is_identity_encoded(&headers));
    }
}
