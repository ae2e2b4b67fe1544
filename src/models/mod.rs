//! Response models for the cache front
//!
//! This module defines the DTOs (Data Transfer Objects) serialized into
//! the JSON bodies of the management endpoints.

pub mod responses;

// Re-export commonly used types
pub use responses::{ErrorResponse, HealthResponse, StatsResponse};
