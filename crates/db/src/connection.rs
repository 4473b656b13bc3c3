//! SQLite pool construction for the booking record store.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use slotly_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// How long a writer waits on a locked database. The booking path retries
/// a failed persist with sub-second backoff, so a blocked writer should
/// outwait a competing booking transaction instead of burning that retry
/// budget on lock errors.
const BUSY_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Open the record store described by the application configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        // Appointment and slot_offer rows reference lead and agent rows.
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_with(options)
        .await
}
