//! Result envelope and submission acknowledgments.
//!
//! Field names are part of the wire contract with HTTP callers and webhook
//! receivers and must not change.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::job::{JobId, JobStatus};

/// Round seconds to millisecond precision.
pub fn round_secs(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// What a job's work returns.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub endpoint: String,
    pub code: u16,
    /// Success payload or error message
    pub result: Result<Value, String>,
}

impl JobOutcome {
    /// Successful outcome with status 200.
    pub fn success(endpoint: impl Into<String>, payload: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            code: 200,
            result: Ok(payload),
        }
    }

    /// Failed outcome.
    pub fn failure(endpoint: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            code,
            result: Err(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Uniform response for a finished job, on both the immediate and queued path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub endpoint: String,
    pub code: u16,
    /// Caller correlation id
    pub id: Option<String>,
    pub job_id: JobId,
    pub response: Option<Value>,
    pub message: String,
    pub pid: u32,
    pub queue_id: u64,
    pub run_time: f64,
    pub queue_time: f64,
    pub total_time: f64,
    pub queue_length: usize,
    pub build_number: String,
}

impl ResultEnvelope {
    /// Build the envelope from a job outcome. Times are given in seconds and
    /// rounded here.
    #[allow(clippy::too_many_arguments)]
    pub fn from_outcome(
        outcome: JobOutcome,
        job_id: JobId,
        id: Option<String>,
        pid: u32,
        queue_id: u64,
        queue_time: f64,
        run_time: f64,
        queue_length: usize,
        build_number: impl Into<String>,
    ) -> Self {
        let (response, message) = match outcome.result {
            Ok(payload) => (Some(payload), "success".to_string()),
            Err(message) => (None, message),
        };

        Self {
            endpoint: outcome.endpoint,
            code: outcome.code,
            id,
            job_id,
            response,
            message,
            pid,
            queue_id,
            run_time: round_secs(run_time),
            queue_time: round_secs(queue_time),
            total_time: round_secs(queue_time + run_time),
            queue_length,
            build_number: build_number.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

/// Configured queue bound as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLimit {
    Limited(usize),
    Unlimited,
}

impl QueueLimit {
    /// `0` means unlimited.
    pub fn from_max(max: usize) -> Self {
        if max == 0 {
            QueueLimit::Unlimited
        } else {
            QueueLimit::Limited(max)
        }
    }
}

impl Serialize for QueueLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueueLimit::Limited(n) => serializer.serialize_u64(*n as u64),
            QueueLimit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Immediate answer to a queued submission: accepted (202) or rejected (429).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionAck {
    pub endpoint: String,
    pub code: u16,
    pub id: Option<String>,
    pub job_id: JobId,
    pub message: String,
    pub pid: u32,
    pub queue_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue_length: Option<QueueLimit>,
    pub queue_length: usize,
    pub build_number: String,
}

/// Observation sent to the status sink at each lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusObservation {
    pub job_status: JobStatus,
    pub job_id: JobId,
    pub queue_id: u64,
    pub process_id: u32,
    pub response: Option<Value>,
}
