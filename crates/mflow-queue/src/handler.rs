//! The seam between the scheduler and the work it runs.

use async_trait::async_trait;

use mflow_models::{JobId, JobOutcome, JobRequest};

/// What the scheduler needs to know about a unit of work before running it.
pub trait JobDescriptor {
    /// Endpoint identifier reported in envelopes.
    fn endpoint(&self) -> &str;

    /// Caller correlation id.
    fn correlation_id(&self) -> Option<&str>;

    /// Webhook target; `Some` (even empty) selects the queued path.
    fn webhook_url(&self) -> Option<&str>;
}

impl JobDescriptor for JobRequest {
    fn endpoint(&self) -> &str {
        JobRequest::endpoint(self)
    }

    fn correlation_id(&self) -> Option<&str> {
        JobRequest::correlation_id(self)
    }

    fn webhook_url(&self) -> Option<&str> {
        JobRequest::webhook_url(self)
    }
}

/// Executes work for the scheduler.
///
/// Failures are reported through the returned [`JobOutcome`], never by
/// returning early; a panic is caught by the scheduler and becomes a 500.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    type Work: JobDescriptor + Send + 'static;

    async fn execute(&self, job_id: &JobId, work: Self::Work) -> JobOutcome;
}
