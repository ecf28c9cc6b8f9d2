//! Job requests accepted by the service.

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineSpec;

pub const COMPOSE_ENDPOINT: &str = "/v1/ffmpeg/compose";
pub const CAPTION_ENDPOINT: &str = "/v1/video/caption";
pub const IMAGE_TO_VIDEO_ENDPOINT: &str = "/v1/image/convert/video";

/// Multi-input / multi-filter / multi-output composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeRequest {
    #[serde(flatten)]
    pub pipeline: PipelineSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Burn an ASS subtitle file into a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRequest {
    pub video_url: String,
    /// Locator of the ASS subtitle file
    pub captions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn default_length() -> f64 {
    5.0
}

fn default_frame_rate() -> u32 {
    30
}

/// Turn a still image into a fixed-length video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageToVideoRequest {
    pub image_url: String,
    /// Video length in seconds
    #[serde(default = "default_length")]
    pub length: f64,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Descriptor of the work a job performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobRequest {
    Compose(ComposeRequest),
    Caption(CaptionRequest),
    ImageToVideo(ImageToVideoRequest),
}

impl JobRequest {
    /// Endpoint identifier reported in the result envelope.
    pub fn endpoint(&self) -> &'static str {
        match self {
            JobRequest::Compose(_) => COMPOSE_ENDPOINT,
            JobRequest::Caption(_) => CAPTION_ENDPOINT,
            JobRequest::ImageToVideo(_) => IMAGE_TO_VIDEO_ENDPOINT,
        }
    }

    /// Caller-supplied correlation id.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            JobRequest::Compose(r) => r.id.as_deref(),
            JobRequest::Caption(r) => r.id.as_deref(),
            JobRequest::ImageToVideo(r) => r.id.as_deref(),
        }
    }

    /// Webhook target, if the caller supplied the key at all.
    pub fn webhook_url(&self) -> Option<&str> {
        match self {
            JobRequest::Compose(r) => r.webhook_url.as_deref(),
            JobRequest::Caption(r) => r.webhook_url.as_deref(),
            JobRequest::ImageToVideo(r) => r.webhook_url.as_deref(),
        }
    }
}
