use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::lead::LeadId;
use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub String);

impl AppointmentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Rescheduled,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(Self::Scheduled),
            "rescheduled" => Some(Self::Rescheduled),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// The durable booking record. Created by the booking sequence, mutated in
/// place by reschedule and cancel, never physically deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub lead_id: LeadId,
    pub agent_id: AgentId,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub notes: String,
    pub conferencing_meeting_id: Option<String>,
    pub conferencing_join_url: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// `rescheduled` behaves like `scheduled` for later reschedule/cancel;
    /// only `cancelled` is terminal.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self.status, next),
            (AppointmentStatus::Scheduled, AppointmentStatus::Rescheduled)
                | (AppointmentStatus::Rescheduled, AppointmentStatus::Rescheduled)
                | (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Rescheduled, AppointmentStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: AppointmentStatus) -> Result<(), ValidationError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(ValidationError::InvalidStatusTransition { from: self.status, to: next })
    }

    pub fn end_at(&self) -> DateTime<Utc> {
        self.start_at + chrono::Duration::minutes(self.duration_minutes)
    }

    pub fn append_note(&mut self, note: &str) {
        if self.notes.is_empty() {
            self.notes = note.to_string();
        } else {
            self.notes.push_str("\n");
            self.notes.push_str(note);
        }
    }
}
