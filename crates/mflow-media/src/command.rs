//! FFmpeg runner.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::plan::InvocationPlan;

/// Result of a successful engine run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Verified output artifacts, in declared order
    pub artifacts: Vec<PathBuf>,
    /// Whatever the engine wrote to stderr
    pub diagnostic: String,
}

/// Runs invocation plans against the ffmpeg binary.
///
/// Holds no shared state, so one runner can serve concurrent jobs.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Option<Duration>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Runner using `ffmpeg`/`ffprobe` from `PATH` with no timeout.
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout: None,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let mut runner = Self::new();
        if let Ok(path) = std::env::var("FFMPEG_PATH") {
            runner.ffmpeg = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("FFPROBE_PATH") {
            runner.ffprobe = PathBuf::from(path);
        }
        runner.timeout = std::env::var("FFMPEG_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        runner
    }

    /// Override the ffmpeg binary.
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    /// Override the ffprobe binary.
    pub fn with_probe_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe = path.into();
        self
    }

    /// Kill the engine if a single invocation runs longer than this.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a plan and verify that every declared output exists and is non-empty.
    pub async fn run(&self, plan: &InvocationPlan) -> MediaResult<RunOutput> {
        let binary = which::which(&self.ffmpeg)
            .map_err(|_| MediaError::FfmpegNotFound(self.ffmpeg.display().to_string()))?;

        let args = plan.args();
        debug!("Running FFmpeg: {} {}", binary.display(), args.join(" "));

        let output = self.exec(&binary, &args).await?;
        let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(MediaError::engine_failed(
                format!("FFmpeg exited with status {}", output.status),
                Some(diagnostic),
                output.status.code(),
            ));
        }

        let mut artifacts = Vec::new();
        for path in plan.outputs() {
            verify_artifact(path, &diagnostic).await?;
            artifacts.push(path.to_path_buf());
        }

        Ok(RunOutput {
            artifacts,
            diagnostic,
        })
    }

    /// Run ffprobe with the given arguments and return its stdout.
    pub async fn probe(&self, args: &[String]) -> MediaResult<Vec<u8>> {
        let binary = which::which(&self.ffprobe)
            .map_err(|_| MediaError::FfprobeNotFound(self.ffprobe.display().to_string()))?;

        let output = self.exec(&binary, args).await?;
        if !output.status.success() {
            return Err(MediaError::FfprobeFailed {
                message: format!("FFprobe exited with status {}", output.status),
                stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
            });
        }
        Ok(output.stdout)
    }

    async fn exec(&self, binary: &Path, args: &[String]) -> MediaResult<Output> {
        let mut command = Command::new(binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, command.output()).await {
                Ok(output) => Ok(output?),
                Err(_) => {
                    warn!(
                        "{} timed out after {} seconds, killing process",
                        binary.display(),
                        timeout.as_secs()
                    );
                    Err(MediaError::engine_failed(
                        format!("timed out after {} seconds", timeout.as_secs()),
                        None,
                        None,
                    ))
                }
            },
            None => Ok(command.output().await?),
        }
    }
}

/// The engine can exit 0 without writing anything; treat that as a failure.
async fn verify_artifact(path: &Path, diagnostic: &str) -> MediaResult<()> {
    let diagnostic = (!diagnostic.is_empty()).then(|| diagnostic.to_string());
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(_) => Err(MediaError::engine_failed(
            format!("output {} is empty", path.display()),
            diagnostic,
            Some(0),
        )),
        Err(_) => Err(MediaError::engine_failed(
            format!("expected output {} was not produced", path.display()),
            diagnostic,
            Some(0),
        )),
    }
}
