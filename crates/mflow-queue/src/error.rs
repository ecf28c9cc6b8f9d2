//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid webhook URL: {0}")]
    InvalidWebhook(String),

    #[error("Webhook returned HTTP {0}")]
    WebhookStatus(u16),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn invalid_webhook(msg: impl Into<String>) -> Self {
        Self::InvalidWebhook(msg.into())
    }
}
