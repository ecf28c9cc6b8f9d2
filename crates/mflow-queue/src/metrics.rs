//! Scheduler metrics.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const QUEUE_LENGTH: &str = "mflow_queue_length";
    pub const JOBS_ENQUEUED_TOTAL: &str = "mflow_jobs_enqueued_total";
    pub const JOBS_REJECTED_TOTAL: &str = "mflow_jobs_rejected_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "mflow_jobs_completed_total";
}

/// Update queue length gauge.
pub fn set_queue_length(length: usize) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Record job enqueued.
pub fn record_job_enqueued(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Record job rejected by admission control.
pub fn record_job_rejected(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::JOBS_REJECTED_TOTAL, &labels).increment(1);
}

/// Record job completed, successful or not.
pub fn record_job_completed(endpoint: &str, code: u16, path: &'static str) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("code", code.to_string()),
        ("path", path.to_string()),
    ];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}
