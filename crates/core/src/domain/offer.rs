use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::lead::LeadId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotOfferId(pub String);

/// A short-lived record of an alternative slot proposed to a lead when
/// their exact request was unavailable. At most one pending offer exists
/// per lead: a new offer supersedes the old one, and confirming a booking
/// clears it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOffer {
    pub id: SlotOfferId,
    pub lead_id: LeadId,
    pub agent_id: AgentId,
    pub slot_start: DateTime<Utc>,
    pub duration_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SlotOffer {
    pub fn new(
        lead_id: LeadId,
        agent_id: AgentId,
        slot_start: DateTime<Utc>,
        duration_minutes: i64,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SlotOfferId(Uuid::new_v4().to_string()),
            lead_id,
            agent_id,
            slot_start,
            duration_minutes,
            created_at: now,
            expires_at: now + chrono::Duration::hours(ttl_hours),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::agent::AgentId;
    use crate::domain::lead::LeadId;

    use super::SlotOffer;

    #[test]
    fn offer_expires_at_ttl_boundary() {
        let now = Utc::now();
        let offer = SlotOffer::new(
            LeadId("lead-1".into()),
            AgentId("agent-1".into()),
            now + Duration::days(1),
            60,
            24,
            now,
        );
        assert!(!offer.is_expired(now));
        assert!(!offer.is_expired(now + Duration::hours(23)));
        assert!(offer.is_expired(now + Duration::hours(24)));
    }
}
