//! Structured job logging.

use tracing::{error, info, warn, Span};

use mflow_models::JobId;

/// Logs job lifecycle events with the job id and endpoint attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    endpoint: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, endpoint: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, endpoint = %self.endpoint, "Job started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, endpoint = %self.endpoint, "Job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, endpoint = %self.endpoint, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, endpoint = %self.endpoint, "Job error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, endpoint = %self.endpoint, "Job completed: {}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Span carrying the job fields, for instrumenting a whole job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, endpoint = %self.endpoint)
    }
}
