use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT NOT NULL UNIQUE,
            password_hash   BLOB NOT NULL,
            role            TEXT NOT NULL DEFAULT 'user'
        );

        CREATE TABLE IF NOT EXISTS cyber_incidents (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            incident_id     INTEGER NOT NULL,
            timestamp       TEXT NOT NULL,
            severity        TEXT NOT NULL,
            category        TEXT NOT NULL,
            status          TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_incidents_timestamp
            ON cyber_incidents(timestamp);

        CREATE TABLE IF NOT EXISTS datasets_metadata (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id      INTEGER NOT NULL,
            name            TEXT NOT NULL,
            row_count       INTEGER NOT NULL,
            column_count    INTEGER NOT NULL,
            uploaded_by     TEXT NOT NULL,
            upload_date     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_datasets_upload_date
            ON datasets_metadata(upload_date);

        CREATE TABLE IF NOT EXISTS it_tickets (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            ticket_id               INTEGER NOT NULL,
            priority                TEXT NOT NULL,
            description             TEXT NOT NULL DEFAULT '',
            status                  TEXT NOT NULL,
            assigned_to             TEXT NOT NULL,
            created_at              TEXT NOT NULL,
            resolution_time_hours   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_created_at
            ON it_tickets(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
