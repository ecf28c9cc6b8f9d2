//! Axum HTTP host for media job submission.
//!
//! This crate provides:
//! - Submission routes for composition, caption and image-to-video jobs
//! - Static download of published artifacts
//! - Health and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, MediaScheduler};
