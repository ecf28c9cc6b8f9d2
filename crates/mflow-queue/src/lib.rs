//! In-process job scheduler.
//!
//! This crate provides:
//! - Two-path dispatch: inline execution or a single FIFO worker
//! - Queue-depth admission control
//! - Status observations at each lifecycle transition
//! - Best-effort webhook delivery of result envelopes

pub mod error;
pub mod handler;
pub mod metrics;
pub mod notifier;
pub mod scheduler;
pub mod sink;

pub use error::{QueueError, QueueResult};
pub use handler::{JobDescriptor, JobHandler};
pub use notifier::WebhookNotifier;
pub use scheduler::{Scheduler, SchedulerConfig, Submission, Worker};
pub use sink::{FileStatusSink, StatusSink, TracingStatusSink};
