//! Error types for the static cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the static cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Directory creation, artifact write or artifact read failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The artifact backing an entry is gone (deleted out-of-band)
    #[error("Cached artifact missing: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// Request path does not yield a usable cache key
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Origin could not be reached or returned an unreadable body
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::ArtifactMissing(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            CacheError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CacheError::Io(_) | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the static cache.
pub type Result<T> = std::result::Result<T, CacheError>;
