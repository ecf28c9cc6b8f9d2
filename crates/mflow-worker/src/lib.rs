//! Media job handlers.
//!
//! This crate provides:
//! - Composition jobs (fetch, compile, run, metadata, publish)
//! - Caption burn-in jobs
//! - Image-to-video jobs
//! - Error to status code mapping for result envelopes

pub mod caption_job;
pub mod compose_job;
pub mod config;
pub mod error;
pub mod handler;
pub mod image_video_job;
pub mod logging;

pub use compose_job::ComposeArtifact;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use handler::MediaJobHandler;
pub use logging::JobLogger;
