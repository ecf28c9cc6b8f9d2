//! Per-artifact metadata extraction.
//!
//! Runs after the primary invocation succeeded. Each requested field is its own
//! sub-invocation; a failing field is logged and left out, never failing the job.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use mflow_models::MetadataRequest;

use crate::command::FfmpegRunner;
use crate::error::{MediaError, MediaResult};
use crate::thumbnail::{generate_thumbnail, thumbnail_path};

/// Metadata gathered for one output artifact. Absent fields were either not
/// requested or failed to extract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputMetadata {
    /// Local path of the generated thumbnail
    pub thumbnail: Option<PathBuf>,
    /// Size in bytes
    pub filesize: Option<u64>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Bitrate in bits/second
    pub bitrate: Option<u64>,
    /// Encoder tag written into the container
    pub encoder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Extract the requested metadata for an artifact.
pub async fn extract_metadata(
    runner: &FfmpegRunner,
    artifact: &Path,
    request: &MetadataRequest,
) -> OutputMetadata {
    let mut metadata = OutputMetadata::default();

    if request.thumbnail {
        match generate_thumbnail(runner, artifact, thumbnail_path(artifact)).await {
            Ok(path) => metadata.thumbnail = Some(path),
            Err(e) => warn!(artifact = %artifact.display(), "Thumbnail extraction failed: {}", e),
        }
    }

    if request.filesize {
        match tokio::fs::metadata(artifact).await {
            Ok(meta) => metadata.filesize = Some(meta.len()),
            Err(e) => warn!(artifact = %artifact.display(), "Filesize extraction failed: {}", e),
        }
    }

    if request.duration {
        match probe_duration(runner, artifact).await {
            Ok(duration) => metadata.duration = Some(duration),
            Err(e) => warn!(artifact = %artifact.display(), "Duration extraction failed: {}", e),
        }
    }

    if request.bitrate {
        match probe_bitrate(runner, artifact).await {
            Ok(bitrate) => metadata.bitrate = Some(bitrate),
            Err(e) => warn!(artifact = %artifact.display(), "Bitrate extraction failed: {}", e),
        }
    }

    if request.encoder {
        match probe_encoder(runner, artifact).await {
            Ok(encoder) => metadata.encoder = Some(encoder),
            Err(e) => warn!(artifact = %artifact.display(), "Encoder extraction failed: {}", e),
        }
    }

    metadata
}

/// Container duration in seconds.
pub async fn probe_duration(runner: &FfmpegRunner, path: &Path) -> MediaResult<f64> {
    let format = probe_format(runner, path, "format=duration").await?;
    parse_field(format.duration, "duration")
}

/// Container bitrate in bits/second.
pub async fn probe_bitrate(runner: &FfmpegRunner, path: &Path) -> MediaResult<u64> {
    let format = probe_format(runner, path, "format=bit_rate").await?;
    parse_field(format.bit_rate, "bit_rate")
}

/// Encoder tag of the container.
pub async fn probe_encoder(runner: &FfmpegRunner, path: &Path) -> MediaResult<String> {
    let mut format = probe_format(runner, path, "format_tags=encoder").await?;
    format
        .tags
        .remove("encoder")
        .ok_or_else(|| MediaError::InvalidMedia("no encoder tag".to_string()))
}

async fn probe_format(runner: &FfmpegRunner, path: &Path, entries: &str) -> MediaResult<FfprobeFormat> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        entries.to_string(),
        "-of".to_string(),
        "json".to_string(),
        path.to_string_lossy().to_string(),
    ];
    let stdout = runner.probe(&args).await?;
    parse_format(&stdout)
}

fn parse_format(stdout: &[u8]) -> MediaResult<FfprobeFormat> {
    let output: FfprobeOutput = serde_json::from_slice(stdout)?;
    Ok(output.format)
}

fn parse_field<T: std::str::FromStr>(value: Option<String>, name: &str) -> MediaResult<T> {
    value
        .filter(|v| v != "N/A")
        .and_then(|v| v.parse::<T>().ok())
        .ok_or_else(|| MediaError::InvalidMedia(format!("missing or invalid {name}")))
}
