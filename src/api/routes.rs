//! API Routes
//!
//! Configures the Axum router with the management endpoints and the
//! caching proxy fallback.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, proxy_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_cache/health` - Health check endpoint
/// - `GET /_cache/stats` - Cache statistics
/// - fallback - caching reverse proxy to the configured origin
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_cache/health", get(health_handler))
        .route("/_cache/stats", get(stats_handler))
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
