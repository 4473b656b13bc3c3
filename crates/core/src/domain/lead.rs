use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Engaged,
    Booked,
    AppointmentCancelled,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Engaged => "engaged",
            Self::Booked => "booked",
            Self::AppointmentCancelled => "appointment_cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "new" => Some(Self::New),
            "engaged" => Some(Self::Engaged),
            "booked" => Some(Self::Booked),
            "appointment_cancelled" => Some(Self::AppointmentCancelled),
            _ => None,
        }
    }
}

/// The customer being booked. Owned elsewhere; the scheduling core only
/// flips `status` as a booking side effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub display_name: String,
    /// Address the outbound notifier delivers to (phone, chat handle).
    pub contact_address: String,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
