//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while compiling or executing a media job.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("FFprobe not found: {0}")]
    FfprobeNotFound(String),

    #[error("Malformed pipeline: {0}")]
    MalformedPipeline(String),

    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),

    #[error(
        "FFmpeg execution failed: {message}{}",
        .diagnostic.as_deref().map(|d| format!("\n{d}")).unwrap_or_default()
    )]
    EngineExecution {
        message: String,
        diagnostic: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MediaError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPipeline(message.into())
    }

    pub fn unsupported(option: impl Into<String>) -> Self {
        Self::UnsupportedOption(option.into())
    }

    /// Create an engine execution failure.
    pub fn engine_failed(
        message: impl Into<String>,
        diagnostic: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EngineExecution {
            message: message.into(),
            diagnostic,
            exit_code,
        }
    }

    /// Errors caused by the request itself rather than by execution.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MediaError::MalformedPipeline(_) | MediaError::UnsupportedOption(_)
        )
    }
}
