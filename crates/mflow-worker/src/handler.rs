//! Scheduler-facing job handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, Instrument};

use mflow_media::FfmpegRunner;
use mflow_models::{JobId, JobOutcome, JobRequest};
use mflow_queue::JobHandler;
use mflow_storage::LocatorResolver;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Runs [`JobRequest`]s: fetches inputs, drives the engine, publishes outputs.
pub struct MediaJobHandler {
    pub(crate) storage: Arc<dyn LocatorResolver>,
    pub(crate) runner: FfmpegRunner,
    pub(crate) config: WorkerConfig,
}

impl MediaJobHandler {
    pub fn new(storage: Arc<dyn LocatorResolver>, runner: FfmpegRunner, config: WorkerConfig) -> Self {
        Self {
            storage,
            runner,
            config,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }
}

/// Per-job state: the files fetched for the job, removed when it ends.
pub(crate) struct JobContext<'a> {
    pub job_id: &'a JobId,
    pub logger: JobLogger,
    work_dir: &'a Path,
    fetched: Vec<PathBuf>,
}

impl<'a> JobContext<'a> {
    fn new(job_id: &'a JobId, endpoint: &str, work_dir: &'a Path) -> Self {
        Self {
            job_id,
            logger: JobLogger::new(job_id, endpoint),
            work_dir,
            fetched: Vec::new(),
        }
    }

    /// Fetch a locator into the work directory, tracked for cleanup.
    pub async fn fetch(&mut self, storage: &dyn LocatorResolver, locator: &str) -> WorkerResult<PathBuf> {
        let path = storage
            .fetch(locator, self.work_dir, self.job_id)
            .await
            .map_err(|e| WorkerError::download_failed(locator, e))?;
        self.fetched.push(path.clone());
        Ok(path)
    }

    async fn cleanup(self) {
        for path in self.fetched {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(job_id = %self.job_id, "Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

#[async_trait]
impl JobHandler for MediaJobHandler {
    type Work = JobRequest;

    async fn execute(&self, job_id: &JobId, work: JobRequest) -> JobOutcome {
        let endpoint = work.endpoint();
        let mut ctx = JobContext::new(job_id, endpoint, &self.config.work_dir);
        let span = ctx.logger.create_span();

        let result = async {
            tokio::fs::create_dir_all(&self.config.work_dir).await?;
            match work {
                JobRequest::Compose(request) => self.run_compose(&mut ctx, request).await,
                JobRequest::Caption(request) => self.run_caption(&mut ctx, request).await,
                JobRequest::ImageToVideo(request) => self.run_image_to_video(&mut ctx, request).await,
            }
        }
        .instrument(span)
        .await;

        let logger = ctx.logger.clone();
        ctx.cleanup().await;

        match result {
            Ok(payload) => {
                logger.log_completion("success");
                JobOutcome::success(endpoint, payload)
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                JobOutcome::failure(endpoint, e.status_code(), e.to_string())
            }
        }
    }
}
