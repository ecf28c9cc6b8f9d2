//! Shared data models for MediaFlow.
//!
//! This crate provides Serde-serializable types for:
//! - Declarative pipeline specifications (inputs, filters, outputs, options)
//! - Job requests accepted by each endpoint
//! - Job identifiers and lifecycle states
//! - The result envelope and submission acknowledgments

pub mod envelope;
pub mod job;
pub mod pipeline;
pub mod request;

// Re-export common types
pub use envelope::{
    round_secs, JobOutcome, QueueLimit, ResultEnvelope, StatusObservation, SubmissionAck,
};
pub use job::{JobId, JobStatus};
pub use pipeline::{
    CliOption, FilterSpec, InputSpec, MetadataRequest, OptionArgument, OutputSpec, PipelineSpec,
};
pub use request::{CaptionRequest, ComposeRequest, ImageToVideoRequest, JobRequest};
