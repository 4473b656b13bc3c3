//! Conferencing collaborator: issues and revokes join links.

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use slotly_core::config::ServiceConfig;
use slotly_core::domain::agent::Agent;
use slotly_core::errors::{ExternalServiceError, ExternalSystem};
use slotly_core::timewindow::format_offset;

use crate::retry::{retry_with_backoff, BackoffPolicy};
use crate::{request_fault, status_fault};

#[derive(Clone, Debug)]
pub struct MeetingRequest {
    pub topic: String,
    pub start: DateTime<Tz>,
    pub duration_minutes: i64,
    pub agenda: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Meeting {
    pub id: String,
    pub join_url: String,
    pub passcode: Option<String>,
}

#[async_trait]
pub trait ConferencingService: Send + Sync {
    async fn create_meeting(
        &self,
        agent: &Agent,
        request: MeetingRequest,
    ) -> Result<Meeting, ExternalServiceError>;

    async fn delete_meeting(
        &self,
        agent: &Agent,
        meeting_id: &str,
    ) -> Result<(), ExternalServiceError>;
}

pub struct HttpConferencingService {
    client: Client,
    base_url: String,
    config: ServiceConfig,
    backoff: BackoffPolicy,
}

#[derive(Debug, Serialize)]
struct CreateMeetingDto<'a> {
    topic: &'a str,
    start_time: String,
    duration_minutes: i64,
    agenda: &'a str,
}

#[derive(Debug, Deserialize)]
struct MeetingCreatedDto {
    id: String,
    join_url: String,
    passcode: Option<String>,
}

impl HttpConferencingService {
    pub fn new(config: &ServiceConfig, backoff: BackoffPolicy) -> Result<Self, ExternalServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                ExternalServiceError::permanent(
                    ExternalSystem::Conferencing,
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

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl ConferencingService for HttpConferencingService {
    async fn create_meeting(
        &self,
        agent: &Agent,
        request: MeetingRequest,
    ) -> Result<Meeting, ExternalServiceError> {
        let url =
            format!("{}/v1/users/{}/meetings", self.base_url, agent.conferencing_host_id);
        let operation = "create_meeting";
        let body = CreateMeetingDto {
            topic: &request.topic,
            start_time: format_offset(&request.start),
            duration_minutes: request.duration_minutes,
            agenda: &request.agenda,
        };

        let created: MeetingCreatedDto = retry_with_backoff(&self.backoff, operation, || {
            let request = self.authorize(self.client.post(&url)).json(&body);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Conferencing, operation, e))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_fault(ExternalSystem::Conferencing, operation, status));
                }
                response
                    .json()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Conferencing, operation, e))
            }
        })
        .await?;

        Ok(Meeting { id: created.id, join_url: created.join_url, passcode: created.passcode })
    }

    async fn delete_meeting(
        &self,
        agent: &Agent,
        meeting_id: &str,
    ) -> Result<(), ExternalServiceError> {
        let url = format!(
            "{}/v1/users/{}/meetings/{}",
            self.base_url, agent.conferencing_host_id, meeting_id
        );
        let operation = "delete_meeting";

        retry_with_backoff(&self.backoff, operation, || {
            let request = self.authorize(self.client.delete(&url));
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Conferencing, operation, e))?;
                let status = response.status();
                if status.is_success() || status == StatusCode::NOT_FOUND {
                    return Ok(());
                }
                Err(status_fault(ExternalSystem::Conferencing, operation, status))
            }
        })
        .await
    }
}
