//! Outbound notification collaborator. Fire-and-forget from the booking
//! core's perspective; delivery tracking lives elsewhere.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use slotly_core::config::MessagingConfig;
use slotly_core::errors::{ExternalServiceError, ExternalSystem};

use crate::retry::{retry_with_backoff, BackoffPolicy};
use crate::{request_fault, status_fault};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), ExternalServiceError>;
}

/// Used when messaging is disabled in configuration.
#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _recipient: &str, _text: &str) -> Result<(), ExternalServiceError> {
        Ok(())
    }
}

pub struct HttpNotifier {
    client: Client,
    base_url: String,
    config: MessagingConfig,
    backoff: BackoffPolicy,
}

#[derive(Debug, Serialize)]
struct SendMessageDto<'a> {
    to: &'a str,
    text: &'a str,
}

impl HttpNotifier {
    pub fn new(config: &MessagingConfig, backoff: BackoffPolicy) -> Result<Self, ExternalServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                ExternalServiceError::permanent(
                    ExternalSystem::Messaging,
                    "client_init",
                    e.to_string(),
                )
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            backoff,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), ExternalServiceError> {
        let url = format!("{}/v1/messages", self.base_url);
        let operation = "send_message";
        let body = SendMessageDto { to: recipient, text };

        retry_with_backoff(&self.backoff, operation, || {
            let mut request = self.client.post(&url).json(&body);
            if let Some(key) = &self.config.api_key {
                request = request.bearer_auth(key.expose_secret());
            }
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Messaging, operation, e))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_fault(ExternalSystem::Messaging, operation, status));
                }
                Ok(())
            }
        })
        .await
    }
}
