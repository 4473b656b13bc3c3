use sqlx::Row;

use slotly_core::domain::agent::AgentId;
use slotly_core::domain::lead::LeadId;
use slotly_core::domain::offer::{SlotOffer, SlotOfferId};

use super::lead::parse_timestamp;
use super::{RepositoryError, SlotOfferRepository};
use crate::DbPool;

pub struct SqlSlotOfferRepository {
    pool: DbPool,
}

impl SqlSlotOfferRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_offer(row: &sqlx::sqlite::SqliteRow) -> Result<SlotOffer, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let lead_id: String =
        row.try_get("lead_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let agent_id: String =
        row.try_get("agent_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let slot_start_str: String =
        row.try_get("slot_start").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let duration_minutes: i64 =
        row.try_get("duration_minutes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expires_at_str: String =
        row.try_get("expires_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(SlotOffer {
        id: SlotOfferId(id),
        lead_id: LeadId(lead_id),
        agent_id: AgentId(agent_id),
        slot_start: parse_timestamp(&slot_start_str, "slot_start")?,
        duration_minutes,
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        expires_at: parse_timestamp(&expires_at_str, "expires_at")?,
    })
}

#[async_trait::async_trait]
impl SlotOfferRepository for SqlSlotOfferRepository {
    async fn find_for_lead(&self, lead_id: &LeadId) -> Result<Option<SlotOffer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, lead_id, agent_id, slot_start, duration_minutes, created_at, expires_at
             FROM slot_offer WHERE lead_id = ?",
        )
        .bind(&lead_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_offer(r)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, offer: SlotOffer) -> Result<(), RepositoryError> {
        // A new offer supersedes any pending one for the lead.
        sqlx::query(
            "INSERT INTO slot_offer (id, lead_id, agent_id, slot_start, duration_minutes,
                                     created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(lead_id) DO UPDATE SET
                id = excluded.id,
                agent_id = excluded.agent_id,
                slot_start = excluded.slot_start,
                duration_minutes = excluded.duration_minutes,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
        )
        .bind(&offer.id.0)
        .bind(&offer.lead_id.0)
        .bind(&offer.agent_id.0)
        .bind(offer.slot_start.to_rfc3339())
        .bind(offer.duration_minutes)
        .bind(offer.created_at.to_rfc3339())
        .bind(offer.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(())
    }

    async fn clear_for_lead(&self, lead_id: &LeadId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM slot_offer WHERE lead_id = ?")
            .bind(&lead_id.0)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        Ok(())
    }
}
