//! External collaborator adapters for the booking core.
//!
//! Three independently-failing services sit behind async ports here:
//! the calendar (busy time + events), the conferencing provider (join
//! links), and the outbound notifier. Every HTTP call goes through the
//! shared retry/backoff helper with retryable/non-retryable fault
//! classification.

pub mod calendar;
pub mod conferencing;
pub mod notify;
pub mod retry;

use reqwest::StatusCode;

use slotly_core::errors::{ExternalServiceError, ExternalSystem};

pub use calendar::{
    AvailabilitySource, CalendarEvent, CalendarEventRequest, CalendarService, HttpCalendarService,
};
pub use conferencing::{ConferencingService, HttpConferencingService, Meeting, MeetingRequest};
pub use notify::{HttpNotifier, NoopNotifier, Notifier};
pub use retry::{retry_with_backoff, BackoffPolicy, Retryable};

/// Transport-level faults (connect, timeout, decode) are worth retrying.
pub(crate) fn request_fault(
    system: ExternalSystem,
    operation: &'static str,
    error: reqwest::Error,
) -> ExternalServiceError {
    ExternalServiceError::retryable(system, operation, error.to_string())
}

/// 5xx and 429 are transient; any other non-success status is a caller
/// problem and is not retried.
pub(crate) fn status_fault(
    system: ExternalSystem,
    operation: &'static str,
    status: StatusCode,
) -> ExternalServiceError {
    let message = format!("unexpected status {status}");
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ExternalServiceError::retryable(system, operation, message)
    } else {
        ExternalServiceError::permanent(system, operation, message)
    }
}
