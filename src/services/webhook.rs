use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

/// Notification sent to the external workflow once all four images are stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDispatch {
    pub job_id: Uuid,
    pub callback_url: String,
    pub lips_url: String,
    pub tongue_url: String,
    pub eyes_url: String,
    pub nails_url: String,
}

/// Delivery channel to the external automation workflow.
#[async_trait]
pub trait WorkflowNotifier: Send + Sync {
    async fn notify(&self, dispatch: &WorkflowDispatch) -> Result<(), NotifyError>;
}

/// Posts dispatches as JSON to an incoming-webhook URL (Make.com scenario).
pub struct WebhookNotifier {
    http: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifyError::Http)?;

        Ok(Self {
            http,
            webhook_url: webhook_url.to_string(),
        })
    }
}

#[async_trait]
impl WorkflowNotifier for WebhookNotifier {
    async fn notify(&self, dispatch: &WorkflowDispatch) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(dispatch)
            .send()
            .await
            .map_err(NotifyError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Workflow webhook rejected dispatch with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}
