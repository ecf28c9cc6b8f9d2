//! Job scheduler: inline execution or a single FIFO worker.
//!
//! A submission without a webhook target (or with bypass requested) runs
//! inline, on a task the caller awaits, and returns the full [`ResultEnvelope`]. Anything else is
//! pushed onto one in-process queue, drained strictly in order by a single
//! [`Worker`], and answered immediately with a 202 acknowledgment, or 429 when
//! the queue is at its configured depth.
//!
//! Inline executions are not serialized against the queue or each other and
//! are not bounded by the depth limit.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use mflow_models::{
    JobId, JobOutcome, JobStatus, QueueLimit, ResultEnvelope, StatusObservation, SubmissionAck,
};

use crate::handler::{JobDescriptor, JobHandler};
use crate::metrics;
use crate::notifier::WebhookNotifier;
use crate::sink::StatusSink;

const DEFAULT_BUILD_NUMBER: &str = "0";

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum queued jobs; 0 means unlimited
    pub max_queue_length: usize,
    /// Reported in every envelope
    pub build_number: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_length: 0,
            build_number: DEFAULT_BUILD_NUMBER.to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_queue_length: std::env::var("MAX_QUEUE_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            build_number: std::env::var("BUILD_NUMBER")
                .unwrap_or_else(|_| DEFAULT_BUILD_NUMBER.to_string()),
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Submission {
    /// Executed inline; carries the work's real status code
    Completed(ResultEnvelope),
    /// Queued (202)
    Accepted(SubmissionAck),
    /// Queue full (429)
    Rejected(SubmissionAck),
}

impl Submission {
    pub fn status_code(&self) -> u16 {
        match self {
            Submission::Completed(envelope) => envelope.code,
            Submission::Accepted(ack) | Submission::Rejected(ack) => ack.code,
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            Submission::Completed(envelope) => &envelope.job_id,
            Submission::Accepted(ack) | Submission::Rejected(ack) => &ack.job_id,
        }
    }
}

struct QueuedJob<W> {
    job_id: JobId,
    work: W,
    enqueued_at: Instant,
}

struct Shared<H: JobHandler> {
    handler: Arc<H>,
    queue: Mutex<VecDeque<QueuedJob<H::Work>>>,
    notify: Notify,
    sink: Arc<dyn StatusSink>,
    notifier: WebhookNotifier,
    config: SchedulerConfig,
    queue_id: u64,
    pid: u32,
}

/// Submission side of the scheduler. Cheap to clone.
pub struct Scheduler<H: JobHandler> {
    shared: Arc<Shared<H>>,
}

impl<H: JobHandler> Clone for Scheduler<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// The single consumer of the queue.
pub struct Worker<H: JobHandler> {
    shared: Arc<Shared<H>>,
}

impl<H: JobHandler> Scheduler<H> {
    /// Create a scheduler and its worker. The worker does nothing until
    /// [`Worker::run`] is spawned.
    pub fn new(
        handler: H,
        sink: Arc<dyn StatusSink>,
        notifier: WebhookNotifier,
        config: SchedulerConfig,
    ) -> (Self, Worker<H>) {
        let queue_id = uuid::Uuid::new_v4().as_u64_pair().0;
        let shared = Arc::new(Shared {
            handler: Arc::new(handler),
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            sink,
            notifier,
            config,
            queue_id,
            pid: std::process::id(),
        });

        info!(
            queue_id,
            max_queue_length = shared.config.max_queue_length,
            "Scheduler created"
        );

        (
            Self {
                shared: Arc::clone(&shared),
            },
            Worker { shared },
        )
    }

    pub fn queue_id(&self) -> u64 {
        self.shared.queue_id
    }

    /// Current number of jobs waiting in the queue.
    pub fn queue_length(&self) -> usize {
        self.shared.lock_queue().len()
    }

    pub fn max_queue_length(&self) -> QueueLimit {
        QueueLimit::from_max(self.shared.config.max_queue_length)
    }

    /// Dispatch: inline when bypass is requested or no webhook key is present.
    pub async fn submit(&self, work: H::Work, bypass: bool) -> Submission {
        if bypass || work.webhook_url().is_none() {
            Submission::Completed(self.submit_immediate(work).await)
        } else {
            self.submit_queued(work)
        }
    }

    /// Run the work without queueing and return its envelope.
    ///
    /// The run is detached from the caller: if the returned future is dropped
    /// the job still reaches `done`.
    pub async fn submit_immediate(&self, work: H::Work) -> ResultEnvelope {
        let shared = Arc::clone(&self.shared);
        let job_id = JobId::new();
        let endpoint = work.endpoint().to_string();
        let correlation_id = work.correlation_id().map(str::to_string);

        debug!(job_id = %job_id, endpoint = %endpoint, "Running job inline");
        let task = {
            let job_id = job_id.clone();
            let endpoint = endpoint.clone();
            let correlation_id = correlation_id.clone();
            tokio::spawn(async move { shared.run_immediate(job_id, endpoint, correlation_id, work).await })
        };

        match task.await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(job_id = %job_id, endpoint = %endpoint, "Inline job task failed: {}", e);
                let envelope = ResultEnvelope::from_outcome(
                    JobOutcome::failure(&endpoint, 500, format!("job task failed: {e}")),
                    job_id.clone(),
                    correlation_id,
                    self.shared.pid,
                    self.shared.queue_id,
                    0.0,
                    0.0,
                    self.queue_length(),
                    self.shared.config.build_number.clone(),
                );
                self.shared.finish(&job_id, &envelope, "immediate");
                envelope
            }
        }
    }

    /// Enqueue the work for the worker, subject to admission control.
    pub fn submit_queued(&self, work: H::Work) -> Submission {
        let shared = &self.shared;
        let job_id = JobId::new();
        let endpoint = work.endpoint().to_string();
        let correlation_id = work.correlation_id().map(str::to_string);
        let max = shared.config.max_queue_length;

        let admitted = {
            let mut queue = shared.lock_queue();
            if max > 0 && queue.len() >= max {
                Err(queue.len())
            } else {
                // Recorded before the push so `queued` is always seen before `running`.
                shared.observe(&job_id, JobStatus::Queued, None);
                queue.push_back(QueuedJob {
                    job_id: job_id.clone(),
                    work,
                    enqueued_at: Instant::now(),
                });
                Ok(queue.len())
            }
        };

        match admitted {
            Ok(queue_length) => {
                shared.notify.notify_one();
                metrics::record_job_enqueued(&endpoint);
                metrics::set_queue_length(queue_length);
                info!(job_id = %job_id, endpoint = %endpoint, queue_length, "Job queued");

                Submission::Accepted(SubmissionAck {
                    endpoint,
                    code: 202,
                    id: correlation_id,
                    job_id,
                    message: "processing".to_string(),
                    pid: shared.pid,
                    queue_id: shared.queue_id,
                    max_queue_length: Some(QueueLimit::from_max(max)),
                    queue_length,
                    build_number: shared.config.build_number.clone(),
                })
            }
            Err(queue_length) => {
                metrics::record_job_rejected(&endpoint);
                warn!(job_id = %job_id, endpoint = %endpoint, queue_length, "Queue full, rejecting job");

                let ack = SubmissionAck {
                    endpoint,
                    code: 429,
                    id: correlation_id,
                    job_id: job_id.clone(),
                    message: format!("MAX_QUEUE_LENGTH ({max}) reached"),
                    pid: shared.pid,
                    queue_id: shared.queue_id,
                    max_queue_length: None,
                    queue_length,
                    build_number: shared.config.build_number.clone(),
                };
                shared.observe(&job_id, JobStatus::Done, serde_json::to_value(&ack).ok());
                Submission::Rejected(ack)
            }
        }
    }
}

impl<H: JobHandler> Worker<H> {
    /// Drain the queue forever, one job at a time, in FIFO order.
    pub async fn run(self) {
        info!(queue_id = self.shared.queue_id, "Queue worker started");
        loop {
            let job = self.next_job().await;
            self.process(job).await;
        }
    }

    /// Process jobs until the queue is empty, then return the number processed.
    pub async fn drain(&self) -> usize {
        let mut processed = 0;
        while let Some(job) = self.shared.pop() {
            self.process(job).await;
            processed += 1;
        }
        processed
    }

    async fn next_job(&self) -> QueuedJob<H::Work> {
        loop {
            if let Some(job) = self.shared.pop() {
                return job;
            }
            self.shared.notify.notified().await;
        }
    }

    async fn process(&self, job: QueuedJob<H::Work>) {
        let shared = &self.shared;
        let dequeued_at = Instant::now();
        let queue_time = dequeued_at.duration_since(job.enqueued_at).as_secs_f64();
        let job_id = job.job_id;
        let endpoint = job.work.endpoint().to_string();
        let correlation_id = job.work.correlation_id().map(str::to_string);
        let webhook_url = job.work.webhook_url().map(str::to_string);

        shared.observe(&job_id, JobStatus::Running, None);
        let outcome = shared.execute(&job_id, &endpoint, job.work).await;
        let run_time = dequeued_at.elapsed().as_secs_f64();

        let envelope = ResultEnvelope::from_outcome(
            outcome,
            job_id.clone(),
            correlation_id,
            shared.pid,
            shared.queue_id,
            queue_time,
            run_time,
            shared.lock_queue().len(),
            shared.config.build_number.clone(),
        );
        shared.finish(&job_id, &envelope, "queued");

        if let Some(url) = webhook_url {
            shared.notifier.deliver(&url, envelope);
        }
    }
}

impl<H: JobHandler> Shared<H> {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<QueuedJob<H::Work>>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pop(&self) -> Option<QueuedJob<H::Work>> {
        let mut queue = self.lock_queue();
        let job = queue.pop_front();
        if job.is_some() {
            metrics::set_queue_length(queue.len());
        }
        job
    }

    fn observe(&self, job_id: &JobId, status: JobStatus, response: Option<Value>) {
        self.sink.record(
            job_id,
            StatusObservation {
                job_status: status,
                job_id: job_id.clone(),
                queue_id: self.queue_id,
                process_id: self.pid,
                response,
            },
        );
    }

    async fn run_immediate(
        &self,
        job_id: JobId,
        endpoint: String,
        correlation_id: Option<String>,
        work: H::Work,
    ) -> ResultEnvelope {
        self.observe(&job_id, JobStatus::Running, None);

        let started = Instant::now();
        let outcome = self.execute(&job_id, &endpoint, work).await;
        let run_time = started.elapsed().as_secs_f64();

        let envelope = ResultEnvelope::from_outcome(
            outcome,
            job_id.clone(),
            correlation_id,
            self.pid,
            self.queue_id,
            0.0,
            run_time,
            self.lock_queue().len(),
            self.config.build_number.clone(),
        );
        self.finish(&job_id, &envelope, "immediate");
        envelope
    }

    /// Run the handler on its own task so a panic becomes a 500 outcome.
    async fn execute(&self, job_id: &JobId, endpoint: &str, work: H::Work) -> JobOutcome {
        let handler = Arc::clone(&self.handler);
        let task_job_id = job_id.clone();
        let result = tokio::spawn(async move { handler.execute(&task_job_id, work).await }).await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job_id = %job_id, endpoint, "Job panicked: {}", e);
                JobOutcome::failure(endpoint, 500, format!("job panicked: {e}"))
            }
        }
    }

    fn finish(&self, job_id: &JobId, envelope: &ResultEnvelope, path: &'static str) {
        metrics::record_job_completed(&envelope.endpoint, envelope.code, path);
        info!(
            job_id = %job_id,
            endpoint = %envelope.endpoint,
            code = envelope.code,
            run_time = envelope.run_time,
            queue_time = envelope.queue_time,
            "Job done"
        );
        self.observe(job_id, JobStatus::Done, serde_json::to_value(envelope).ok());
    }
}
