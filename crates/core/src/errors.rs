use thiserror::Error;

use crate::domain::appointment::AppointmentStatus;

/// Caller mistakes and business-rule rejections. Never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("requested time {0} is in the past")]
    PastInstant(String),
    #[error("requested time is within the {buffer_minutes}-minute booking buffer")]
    TooSoon { buffer_minutes: i64 },
    #[error("requested time falls outside the agent's working hours")]
    OutsideWorkingHours,
    #[error("requested slot conflicts with an existing commitment")]
    SlotConflict,
    #[error("slot was booked by another request")]
    SlotTaken,
    #[error("invalid working hours: start {start} must be before end {end} (max 24)")]
    InvalidWorkingHours { start: u32, end: u32 },
    #[error("invalid weekday {0} (expected 0..=6)")]
    InvalidWeekday(u8),
    #[error("unknown business timezone `{0}`")]
    UnknownTimezone(String),
    #[error("invalid appointment transition from {from:?} to {to:?}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalSystem {
    Calendar,
    Conferencing,
    Messaging,
}

impl ExternalSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Conferencing => "conferencing",
            Self::Messaging => "messaging",
        }
    }
}

impl std::fmt::Display for ExternalSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault from one of the external collaborators, tagged with enough
/// context to log which system and operation failed and whether the fault
/// class is worth retrying.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{system} {operation} failed: {message}")]
pub struct ExternalServiceError {
    pub system: ExternalSystem,
    pub operation: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ExternalServiceError {
    pub fn retryable(system: ExternalSystem, operation: &'static str, message: String) -> Self {
        Self { system, operation, message, retryable: true }
    }

    pub fn permanent(system: ExternalSystem, operation: &'static str, message: String) -> Self {
        Self { system, operation, message, retryable: false }
    }
}

/// Outcome of one compensating delete attempted after a fatal persistence
/// failure. Individually logged; never masks the original error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompensationAction {
    pub system: ExternalSystem,
    pub resource_id: String,
    pub succeeded: bool,
}

/// Record-store persistence exhausted its retry budget after external
/// resources may already have been created. Carries the compensation
/// report so callers can audit what was rolled back.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("appointment persistence failed after {attempts} attempts: {cause}")]
pub struct TransactionFailedError {
    pub attempts: u32,
    pub cause: String,
    pub compensation: Vec<CompensationAction>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("appointment not found: {0}")]
    Appointment(String),
    #[error("agent not found: {0}")]
    Agent(String),
    #[error("lead not found: {0}")]
    Lead(String),
}

/// Umbrella error for the booking call paths.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    External(#[from] ExternalServiceError),
    #[error(transparent)]
    TransactionFailed(#[from] TransactionFailedError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl BookingError {
    /// Human-readable failure class. "No slots" and "system error" are
    /// deliberately distinct so the caller never tells a lead to retry a
    /// slot that will never be free.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::SlotConflict)
            | Self::Validation(ValidationError::SlotTaken) => {
                "That time is no longer available. Please pick another slot."
            }
            Self::Validation(_) | Self::NotFound(_) => {
                "The request could not be processed. Check the details and try again."
            }
            Self::External(_) | Self::TransactionFailed(_) | Self::Persistence(_) => {
                "A system error occurred while booking. Please retry shortly."
            }
        }
    }
}
