//! Thumbnail generation.

use std::path::{Path, PathBuf};

use crate::command::FfmpegRunner;
use crate::error::MediaResult;
use crate::plan::InvocationPlan;

/// Thumbnail width; height keeps the aspect ratio.
pub const THUMBNAIL_SCALE_WIDTH: u32 = 480;

/// Thumbnail path for an artifact: `<stem>_thumbnail.jpg` next to it.
pub fn thumbnail_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    artifact.with_file_name(format!("{stem}_thumbnail.jpg"))
}

/// Build the single-frame extraction plan.
pub fn thumbnail_plan(video_path: &Path, output_path: &Path) -> MediaResult<InvocationPlan> {
    InvocationPlan::builder()
        .input(Vec::<String>::new(), video_path.to_string_lossy())
        .output(
            [
                "-frames:v".to_string(),
                "1".to_string(),
                "-vf".to_string(),
                format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH),
            ],
            output_path,
        )
        .build()
}

/// Generate a thumbnail from a video file.
pub async fn generate_thumbnail(
    runner: &FfmpegRunner,
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let plan = thumbnail_plan(video_path.as_ref(), output_path.as_ref())?;
    runner.run(&plan).await?;
    Ok(output_path.as_ref().to_path_buf())
}
