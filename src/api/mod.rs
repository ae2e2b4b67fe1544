//! API Module
//!
//! Axum front for the static cache: a caching reverse proxy plus
//! management endpoints.
//!
//! # Endpoints
//! - `GET /_cache/health` - Health check endpoint
//! - `GET /_cache/stats` - Cache statistics
//! - anything else - proxied to the origin, static GETs served from cache

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
