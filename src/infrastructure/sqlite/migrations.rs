use crate::domain::error::DomainError;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS observations (
            id TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            symbol TEXT NOT NULL,
            price REAL NOT NULL,
            confidence REAL NOT NULL,
            publish_time INTEGER NOT NULL,
            dimension INTEGER NOT NULL,
            vector BLOB NOT NULL,
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_observations_asset ON observations(asset_id);
        CREATE INDEX IF NOT EXISTS idx_observations_published ON observations(publish_time);
        "
    ).map_err(|e| DomainError::Database(format!("Migration failed: {e}")))
}
