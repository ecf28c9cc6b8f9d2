//! Still image to video synthesis.

use std::path::Path;

use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::plan::InvocationPlan;

const LANDSCAPE: (u32, u32) = (1920, 1080);
const PORTRAIT: (u32, u32) = (1080, 1920);

/// Output frame size for a source image: landscape sources get 1920x1080,
/// everything else (including square) 1080x1920.
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width > height {
        LANDSCAPE
    } else {
        PORTRAIT
    }
}

/// Read image dimensions without decoding the whole image.
pub async fn read_image_dimensions(path: &Path) -> MediaResult<(u32, u32)> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let owned = path.to_path_buf();
    let dims = tokio::task::spawn_blocking(move || image::image_dimensions(&owned))
        .await
        .map_err(|e| MediaError::InvalidMedia(format!("dimension probe task failed: {e}")))??;
    debug!(path = %path.display(), width = dims.0, height = dims.1, "Read image dimensions");
    Ok(dims)
}

/// Loop a still image into a video of `length` seconds at `frame_rate`.
pub fn image_to_video_plan(
    image: &Path,
    dimensions: (u32, u32),
    length: f64,
    frame_rate: u32,
    output: &Path,
) -> MediaResult<InvocationPlan> {
    if !(length.is_finite() && length > 0.0) {
        return Err(MediaError::malformed(format!("invalid length: {length}")));
    }
    if frame_rate == 0 {
        return Err(MediaError::malformed("frame_rate must be positive"));
    }

    let (width, height) = target_dimensions(dimensions.0, dimensions.1);
    let rate = frame_rate.to_string();

    InvocationPlan::builder()
        .input(
            ["-framerate".to_string(), rate.clone(), "-loop".to_string(), "1".to_string()],
            image.to_string_lossy(),
        )
        .output(
            [
                "-vf".to_string(),
                format!("scale={width}x{height},fps={frame_rate}"),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-crf".to_string(),
                "28".to_string(),
                "-preset".to_string(),
                "ultrafast".to_string(),
                "-r".to_string(),
                rate,
                "-t".to_string(),
                length.to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
            ],
            output,
        )
        .build()
}
