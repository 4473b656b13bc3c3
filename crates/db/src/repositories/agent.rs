use std::collections::BTreeSet;

use sqlx::Row;

use slotly_core::domain::agent::{Agent, AgentId, WorkingHours};

use super::{AgentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAgentRepository {
    pool: DbPool,
}

impl SqlAgentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn weekdays_as_str(weekdays: &BTreeSet<u8>) -> String {
    weekdays.iter().map(u8::to_string).collect::<Vec<_>>().join(",")
}

pub(crate) fn parse_weekdays(raw: &str) -> Result<BTreeSet<u8>, RepositoryError> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.trim()
                .parse::<u8>()
                .map_err(|_| RepositoryError::Decode(format!("invalid weekday `{part}`")))
        })
        .collect()
}

fn row_to_agent(row: &sqlx::sqlite::SqliteRow) -> Result<Agent, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let display_name: String =
        row.try_get("display_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let start_hour: i64 =
        row.try_get("start_hour").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let end_hour: i64 =
        row.try_get("end_hour").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let weekdays_raw: String =
        row.try_get("weekdays").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let conferencing_host_id: String =
        row.try_get("conferencing_host_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let calendar_id: String =
        row.try_get("calendar_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let working_hours = WorkingHours {
        start_hour: start_hour as u32,
        end_hour: end_hour as u32,
        weekdays: parse_weekdays(&weekdays_raw)?,
    };
    working_hours.validate().map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Agent {
        id: AgentId(id),
        display_name,
        working_hours,
        conferencing_host_id,
        calendar_id,
    })
}

#[async_trait::async_trait]
impl AgentRepository for SqlAgentRepository {
    async fn find_by_id(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, display_name, start_hour, end_hour, weekdays,
                    conferencing_host_id, calendar_id
             FROM agent WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_agent(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, agent: Agent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO agent (id, display_name, start_hour, end_hour, weekdays,
                                conferencing_host_id, calendar_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                start_hour = excluded.start_hour,
                end_hour = excluded.end_hour,
                weekdays = excluded.weekdays,
                conferencing_host_id = excluded.conferencing_host_id,
                calendar_id = excluded.calendar_id",
        )
        .bind(&agent.id.0)
        .bind(&agent.display_name)
        .bind(agent.working_hours.start_hour as i64)
        .bind(agent.working_hours.end_hour as i64)
        .bind(weekdays_as_str(&agent.working_hours.weekdays))
        .bind(&agent.conferencing_host_id)
        .bind(&agent.calendar_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_weekdays, weekdays_as_str};

    #[test]
    fn weekday_codec_round_trips() {
        let days = [0u8, 2, 4].into_iter().collect();
        let encoded = weekdays_as_str(&days);
        assert_eq!(encoded, "0,2,4");
        assert_eq!(parse_weekdays(&encoded).expect("decodes"), days);
    }

    #[test]
    fn empty_weekday_list_decodes_to_empty_set() {
        assert!(parse_weekdays("").expect("decodes").is_empty());
    }

    #[test]
    fn garbage_weekday_is_a_decode_error() {
        assert!(parse_weekdays("0,x,2").is_err());
    }
}
