//! Completion notifier — tells the host application the tour finished.
//!
//! Fire-and-forget: the local completion flag is already committed when this
//! runs, so failures are reported to the caller for logging only.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::CompletionConfig;
use crate::error::NotifyError;

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Outbound completion callback.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify_completed(&self) -> Result<(), NotifyError>;
}

/// Used when no completion endpoint is configured.
pub struct NoopNotifier;

#[async_trait]
impl CompletionNotifier for NoopNotifier {
    async fn notify_completed(&self) -> Result<(), NotifyError> {
        tracing::debug!("No completion endpoint configured, skipping notify");
        Ok(())
    }
}

/// POSTs an empty JSON request to the host's completion endpoint.
pub struct HttpCompletionNotifier {
    endpoint: String,
    csrf_token: SecretString,
    client: reqwest::Client,
}

impl HttpCompletionNotifier {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            endpoint: config.endpoint,
            csrf_token: config.csrf_token,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionNotifier for HttpCompletionNotifier {
    async fn notify_completed(&self) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(CSRF_HEADER, self.csrf_token.expose_secret())
            .send()
            .await
            .map_err(|e| NotifyError::RequestFailed {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        tracing::info!(endpoint = %self.endpoint, response = %body, "Tour completion recorded by host");
        Ok(())
    }
}

/// Pick the notifier for the configured completion settings.
pub fn from_config(completion: Option<CompletionConfig>) -> std::sync::Arc<dyn CompletionNotifier> {
    match completion {
        Some(config) => std::sync::Arc::new(HttpCompletionNotifier::new(config)),
        None => std::sync::Arc::new(NoopNotifier),
    }
}
