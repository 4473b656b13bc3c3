use sqlx::Row;

use slotly_core::domain::agent::AgentId;
use slotly_core::domain::appointment::{Appointment, AppointmentId, AppointmentStatus};
use slotly_core::domain::lead::LeadId;

use super::lead::parse_timestamp;
use super::{AppointmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAppointmentRepository {
    pool: DbPool,
}

impl SqlAppointmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_appointment(row: &sqlx::sqlite::SqliteRow) -> Result<Appointment, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let lead_id: String =
        row.try_get("lead_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let agent_id: String =
        row.try_get("agent_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let start_at_str: String =
        row.try_get("start_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let duration_minutes: i64 =
        row.try_get("duration_minutes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: String = row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let conferencing_meeting_id: Option<String> = row
        .try_get("conferencing_meeting_id")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let conferencing_join_url: Option<String> = row
        .try_get("conferencing_join_url")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let calendar_event_id: Option<String> =
        row.try_get("calendar_event_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = AppointmentStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown appointment status `{status_str}`"))
    })?;

    Ok(Appointment {
        id: AppointmentId(id),
        lead_id: LeadId(lead_id),
        agent_id: AgentId(agent_id),
        start_at: parse_timestamp(&start_at_str, "start_at")?,
        duration_minutes,
        status,
        notes,
        conferencing_meeting_id,
        conferencing_join_url,
        calendar_event_id,
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        updated_at: parse_timestamp(&updated_at_str, "updated_at")?,
    })
}

#[async_trait::async_trait]
impl AppointmentRepository for SqlAppointmentRepository {
    async fn find_by_id(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, lead_id, agent_id, start_at, duration_minutes, status, notes,
                    conferencing_meeting_id, conferencing_join_url, calendar_event_id,
                    created_at, updated_at
             FROM appointment WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_appointment(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, appointment: Appointment) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO appointment (id, lead_id, agent_id, start_at, duration_minutes,
                                      status, notes, conferencing_meeting_id,
                                      conferencing_join_url, calendar_event_id,
                                      created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&appointment.id.0)
        .bind(&appointment.lead_id.0)
        .bind(&appointment.agent_id.0)
        .bind(appointment.start_at.to_rfc3339())
        .bind(appointment.duration_minutes)
        .bind(appointment.status.as_str())
        .bind(&appointment.notes)
        .bind(&appointment.conferencing_meeting_id)
        .bind(&appointment.conferencing_join_url)
        .bind(&appointment.calendar_event_id)
        .bind(appointment.created_at.to_rfc3339())
        .bind(appointment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(())
    }

    async fn update(&self, appointment: Appointment) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE appointment SET
                start_at = ?, duration_minutes = ?, status = ?, notes = ?,
                conferencing_meeting_id = ?, conferencing_join_url = ?,
                calendar_event_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(appointment.start_at.to_rfc3339())
        .bind(appointment.duration_minutes)
        .bind(appointment.status.as_str())
        .bind(&appointment.notes)
        .bind(&appointment.conferencing_meeting_id)
        .bind(&appointment.conferencing_join_url)
        .bind(&appointment.calendar_event_id)
        .bind(appointment.updated_at.to_rfc3339())
        .bind(&appointment.id.0)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(())
    }
}
