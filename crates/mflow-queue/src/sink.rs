//! Status sinks: where lifecycle observations go.
//!
//! Recording is fire-and-forget. A sink must not block the caller and its
//! failures never affect the job.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mflow_models::{JobId, StatusObservation};

use crate::error::QueueResult;

/// Receives one observation per lifecycle transition.
pub trait StatusSink: Send + Sync {
    fn record(&self, job_id: &JobId, observation: StatusObservation);
}

/// Logs observations.
#[derive(Debug, Default, Clone)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn record(&self, job_id: &JobId, observation: StatusObservation) {
        let code = observation
            .response
            .as_ref()
            .and_then(|r| r.get("code"))
            .and_then(|c| c.as_u64());
        info!(
            job_id = %job_id,
            job_status = %observation.job_status,
            queue_id = observation.queue_id,
            process_id = observation.process_id,
            code = ?code,
            "Job status changed"
        );
    }
}

/// Writes the latest observation of each job to `{dir}/{job_id}.json`.
///
/// Writes go through a single background task so that the file always ends
/// up holding the last observation recorded.
#[derive(Debug, Clone)]
pub struct FileStatusSink {
    dir: PathBuf,
    tx: mpsc::UnboundedSender<(JobId, StatusObservation)>,
}

impl FileStatusSink {
    /// Create the sink and its writer task. Must be called inside a Tokio runtime.
    pub fn spawn(dir: impl AsRef<Path>) -> QueueResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<(JobId, StatusObservation)>();
        let writer_dir = dir.clone();
        tokio::spawn(async move {
            while let Some((job_id, observation)) = rx.recv().await {
                if let Err(e) = write_observation(&writer_dir, &job_id, &observation).await {
                    warn!(job_id = %job_id, "Failed to write job status: {}", e);
                }
            }
            debug!("Status writer stopped");
        });

        Ok(Self { dir, tx })
    }

    /// Create from `JOB_STATUS_DIR`, if set.
    pub fn from_env() -> QueueResult<Option<Self>> {
        match std::env::var("JOB_STATUS_DIR") {
            Ok(dir) if !dir.trim().is_empty() => Ok(Some(Self::spawn(dir)?)),
            _ => Ok(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the status file for a job.
    pub fn status_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }
}

impl StatusSink for FileStatusSink {
    fn record(&self, job_id: &JobId, observation: StatusObservation) {
        if self.tx.send((job_id.clone(), observation)).is_err() {
            warn!(job_id = %job_id, "Status writer is gone, dropping observation");
        }
    }
}

async fn write_observation(dir: &Path, job_id: &JobId, observation: &StatusObservation) -> QueueResult<()> {
    let body = serde_json::to_vec_pretty(observation)?;
    let path = dir.join(format!("{job_id}.json"));
    let tmp = dir.join(format!("{job_id}.json.tmp"));
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}
