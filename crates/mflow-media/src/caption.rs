//! Caption burn-in plan.

use std::path::Path;

use crate::error::MediaResult;
use crate::plan::InvocationPlan;

/// Escape a path for use inside a quoted `subtitles` filter argument.
fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '\\' | '\'' | ':' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Burn an ASS subtitle file into a video. Audio is stream-copied.
pub fn caption_plan(video: &Path, subtitles: &Path, output: &Path) -> MediaResult<InvocationPlan> {
    InvocationPlan::builder()
        .input(Vec::<String>::new(), video.to_string_lossy())
        .output(
            [
                "-vf".to_string(),
                format!("subtitles='{}'", escape_filter_path(subtitles)),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-c:a".to_string(),
                "copy".to_string(),
                "-movflags".to_string(),
                "+faststart".to_string(),
            ],
            output,
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_plan_args() {
        let plan = caption_plan(
            Path::new("/data/in.mp4"),
            Path::new("/data/job_captions.ass"),
            Path::new("/data/job_captioned.mp4"),
        )
        .unwrap();

        assert_eq!(plan.inputs(), vec!["/data/in.mp4"]);
        let args = plan.args();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "subtitles='/data/job_captions.ass'");
        let ca = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[ca + 1], "copy");
        assert_eq!(args.last().map(String::as_str), Some("/data/job_captioned.mp4"));
    }

    #[test]
    fn test_filter_path_escaping() {
        assert_eq!(
            escape_filter_path(Path::new("/tmp/it's:here.ass")),
            "/tmp/it\\'s\\:here.ass"
        );
    }
}
