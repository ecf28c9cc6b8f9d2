//! Pipeline compiler and FFmpeg CLI runner.
//!
//! This crate provides:
//! - Compilation of declarative pipeline specs into ordered invocation plans
//! - Execution of plans against the ffmpeg binary with output verification
//! - Per-artifact metadata extraction (thumbnail, size, duration, bitrate, encoder)
//! - Fixed plans for caption burn-in and image-to-video synthesis

pub mod caption;
pub mod command;
pub mod compose;
pub mod error;
pub mod image_video;
pub mod metadata;
pub mod plan;
pub mod thumbnail;

pub use caption::caption_plan;
pub use command::{FfmpegRunner, RunOutput};
pub use compose::{compile, OutputNaming, FILTER_GRAPH_SEPARATOR};
pub use error::{MediaError, MediaResult};
pub use image_video::{image_to_video_plan, read_image_dimensions, target_dimensions};
pub use metadata::{extract_metadata, OutputMetadata};
pub use plan::{InvocationPlan, PlanBuilder, PlanElement};
pub use thumbnail::generate_thumbnail;
