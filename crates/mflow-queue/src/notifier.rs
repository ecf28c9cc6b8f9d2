//! Webhook delivery of result envelopes.
//!
//! One POST per finished queued job, no retry. Failures are logged and
//! otherwise ignored.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use mflow_models::ResultEnvelope;

use crate::error::{QueueError, QueueResult};

/// HTTP request timeout for a single delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers result envelopes to caller-supplied webhook endpoints.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a notifier with a pre-configured HTTP client.
    pub fn new() -> QueueResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Send the envelope on a background task.
    ///
    /// Returns `None` when the target is not a well-formed absolute http(s)
    /// URL, in which case nothing is sent.
    pub fn deliver(&self, url: &str, envelope: ResultEnvelope) -> Option<JoinHandle<()>> {
        let target = match validate_webhook_url(url) {
            Ok(target) => target,
            Err(e) => {
                warn!(job_id = %envelope.job_id, "Skipping webhook delivery: {}", e);
                return None;
            }
        };

        let notifier = self.clone();
        Some(tokio::spawn(async move {
            let job_id = envelope.job_id.clone();
            match notifier.send(target.clone(), &envelope).await {
                Ok(()) => info!(job_id = %job_id, url = %target, "Webhook delivered"),
                Err(e) => warn!(job_id = %job_id, url = %target, error = %e, "Webhook delivery failed"),
            }
        }))
    }

    /// Execute a single POST request and check the response status.
    pub async fn send(&self, url: Url, envelope: &ResultEnvelope) -> QueueResult<()> {
        let response = self.client.post(url).json(envelope).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::WebhookStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Parse a webhook target; only absolute http(s) URLs are accepted.
pub fn validate_webhook_url(url: &str) -> QueueResult<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(QueueError::invalid_webhook("empty"));
    }
    let parsed = Url::parse(trimmed).map_err(|e| QueueError::invalid_webhook(format!("{trimmed}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(parsed),
        _ => Err(QueueError::invalid_webhook(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mflow_models::{JobId, JobOutcome};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope() -> ResultEnvelope {
        ResultEnvelope::from_outcome(
            JobOutcome::success("/v1/video/caption", json!("http://x/download/a.mp4")),
            JobId::from_string("job-7"),
            Some("req-7".into()),
            1,
            2,
            0.1,
            0.2,
            0,
            "3",
        )
    }

    #[test]
    fn test_validate_webhook_url() {
        assert!(validate_webhook_url("https://hooks.example.com/done").is_ok());
        assert!(validate_webhook_url("http://127.0.0.1:9000/x").is_ok());
        assert!(validate_webhook_url("").is_err());
        assert!(validate_webhook_url("   ").is_err());
        assert!(validate_webhook_url("/relative").is_err());
        assert!(validate_webhook_url("ftp://example.com").is_err());
        assert!(validate_webhook_url("mailto:ops@example.com").is_err());
    }

    #[tokio::test]
    async fn test_delivers_envelope_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(json!({"job_id": "job-7", "code": 200, "id": "req-7"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new().unwrap();
        let handle = notifier
            .deliver(&format!("{}/hook", server.uri()), envelope())
            .unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            // one request per call
            .expect(2)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new().unwrap();
        let err = notifier
            .send(Url::parse(&server.uri()).unwrap(), &envelope())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::WebhookStatus(503)));

        notifier.deliver(&server.uri(), envelope()).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_target_is_skipped() {
        let notifier = WebhookNotifier::new().unwrap();
        assert!(notifier.deliver("not a url", envelope()).is_none());
    }
}
