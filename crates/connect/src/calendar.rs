//! Availability source and calendar event adapter.
//!
//! The calendar service is the source of truth for busy time. Reads fail
//! closed: a fetch fault is surfaced as an error, never treated as
//! "available".

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use slotly_core::config::ServiceConfig;
use slotly_core::domain::agent::Agent;
use slotly_core::domain::interval::BusyInterval;
use slotly_core::errors::{ExternalServiceError, ExternalSystem};
use slotly_core::timewindow::format_offset;

use crate::retry::{retry_with_backoff, BackoffPolicy};
use crate::{request_fault, status_fault};

/// Busy-time reads over the external calendar.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// All busy intervals for `[start, end]` in one batched call.
    async fn busy_intervals(
        &self,
        agent: &Agent,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<BusyInterval>, ExternalServiceError>;

    /// Single-slot availability, provided in terms of `busy_intervals` plus
    /// the shared half-open overlap predicate so this path and slot
    /// filtering can never disagree.
    async fn is_available(
        &self,
        agent: &Agent,
        start: DateTime<Tz>,
        duration_minutes: i64,
    ) -> Result<bool, ExternalServiceError> {
        let end = start + Duration::minutes(duration_minutes);
        let busy = self.busy_intervals(agent, start, end).await?;
        Ok(!busy.iter().any(|b| b.overlaps(start, end)))
    }
}

#[derive(Clone, Debug)]
pub struct CalendarEventRequest {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
}

/// Full calendar collaborator: busy reads plus event create/delete.
#[async_trait]
pub trait CalendarService: AvailabilitySource {
    async fn create_event(
        &self,
        agent: &Agent,
        request: CalendarEventRequest,
    ) -> Result<CalendarEvent, ExternalServiceError>;

    async fn delete_event(
        &self,
        agent: &Agent,
        event_id: &str,
    ) -> Result<(), ExternalServiceError>;
}

pub struct HttpCalendarService {
    client: Client,
    base_url: String,
    config: ServiceConfig,
    backoff: BackoffPolicy,
    zone: Tz,
}

#[derive(Debug, Deserialize)]
struct BusyPeriodDto {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize)]
struct CreateEventDto<'a> {
    summary: &'a str,
    description: &'a str,
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct EventCreatedDto {
    id: String,
}

impl HttpCalendarService {
    pub fn new(
        config: &ServiceConfig,
        backoff: BackoffPolicy,
        zone: Tz,
    ) -> Result<Self, ExternalServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                ExternalServiceError::permanent(
                    ExternalSystem::Calendar,
                    "client_init",
                    e.to_string(),
                )
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            backoff,
            zone,
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
impl AvailabilitySource for HttpCalendarService {
    async fn busy_intervals(
        &self,
        agent: &Agent,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<BusyInterval>, ExternalServiceError> {
        let url = format!("{}/v1/calendars/{}/busy", self.base_url, agent.calendar_id);
        let operation = "busy_intervals";

        let periods: Vec<BusyPeriodDto> = retry_with_backoff(&self.backoff, operation, || {
            let request = self
                .authorize(self.client.get(&url))
                .query(&[("start", format_offset(&start)), ("end", format_offset(&end))]);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Calendar, operation, e))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_fault(ExternalSystem::Calendar, operation, status));
                }
                response
                    .json()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Calendar, operation, e))
            }
        })
        .await?;

        Ok(periods
            .into_iter()
            .map(|p| BusyInterval {
                start: p.start.with_timezone(&self.zone),
                end: p.end.with_timezone(&self.zone),
            })
            .collect())
    }
}

#[async_trait]
impl CalendarService for HttpCalendarService {
    async fn create_event(
        &self,
        agent: &Agent,
        request: CalendarEventRequest,
    ) -> Result<CalendarEvent, ExternalServiceError> {
        let url = format!("{}/v1/calendars/{}/events", self.base_url, agent.calendar_id);
        let operation = "create_event";
        let body = CreateEventDto {
            summary: &request.summary,
            description: &request.description,
            start: format_offset(&request.start),
            end: format_offset(&request.end),
        };

        let created: EventCreatedDto = retry_with_backoff(&self.backoff, operation, || {
            let request = self.authorize(self.client.post(&url)).json(&body);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Calendar, operation, e))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_fault(ExternalSystem::Calendar, operation, status));
                }
                response
                    .json()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Calendar, operation, e))
            }
        })
        .await?;

        Ok(CalendarEvent { id: created.id })
    }

    async fn delete_event(
        &self,
        agent: &Agent,
        event_id: &str,
    ) -> Result<(), ExternalServiceError> {
        let url =
            format!("{}/v1/calendars/{}/events/{}", self.base_url, agent.calendar_id, event_id);
        let operation = "delete_event";

        retry_with_backoff(&self.backoff, operation, || {
            let request = self.authorize(self.client.delete(&url));
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| request_fault(ExternalSystem::Calendar, operation, e))?;
                let status = response.status();
                // Deleting an already-gone event is a success for
                // compensation purposes.
                if status.is_success() || status == StatusCode::NOT_FOUND {
                    return Ok(());
                }
                Err(status_fault(ExternalSystem::Calendar, operation, status))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;

    use slotly_core::domain::agent::{Agent, AgentId, WorkingHours};
    use slotly_core::domain::interval::BusyInterval;
    use slotly_core::errors::ExternalServiceError;

    use super::AvailabilitySource;

    struct StaticBusy(Vec<BusyInterval>);

    #[async_trait]
    impl AvailabilitySource for StaticBusy {
        async fn busy_intervals(
            &self,
            _agent: &Agent,
            _start: DateTime<Tz>,
            _end: DateTime<Tz>,
        ) -> Result<Vec<BusyInterval>, ExternalServiceError> {
            Ok(self.0.clone())
        }
    }

    fn agent() -> Agent {
        Agent {
            id: AgentId("agent-1".into()),
            display_name: "Dana".into(),
            working_hours: WorkingHours::new(9, 18, [0, 1, 2, 3, 4]).expect("hours"),
            conferencing_host_id: "host-1".into(),
            calendar_id: "cal-1".into(),
        }
    }

    fn at(h: u32) -> DateTime<Tz> {
        chrono_tz::Asia::Singapore.with_ymd_and_hms(2024, 6, 17, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn is_available_reuses_the_overlap_predicate() {
        let source = StaticBusy(vec![BusyInterval { start: at(10), end: at(11) }]);
        // Occupied hour conflicts, adjacent hours do not.
        assert!(!source.is_available(&agent(), at(10), 60).await.expect("check"));
        assert!(source.is_available(&agent(), at(9), 60).await.expect("check"));
        assert!(source.is_available(&agent(), at(11), 60).await.expect("check"));
    }
}
