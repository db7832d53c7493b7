pub mod migrations;
pub mod models;

pub use rusqlite;

mod datasets;
mod import;
mod incidents;
mod tickets;
mod users;

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Single-writer handle over the embedded store. Every Record Access
/// operation is one auto-committed statement; reads always go back to
/// the store (no caching above it).
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Ephemeral store, used by tests and throwaway tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}

/// Map a stored TEXT column onto one of the typed enumerations, surfacing
/// junk values as a column conversion error instead of a panic.
pub(crate) fn column_enum<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Run a two-column `GROUP BY` query of the shape (label, COUNT(*)).
pub(crate) fn label_counts(
    conn: &Connection,
    sql: &str,
) -> rusqlite::Result<Vec<opsdeck_types::api::LabelCount>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(opsdeck_types::api::LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_types::api::NewDataset;

    #[test]
    fn reopening_an_existing_store_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opsdeck.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_dataset(&NewDataset {
                dataset_id: 1,
                name: "Sales_2025".into(),
                row_count: 100,
                column_count: 5,
                uploaded_by: "alice".into(),
                upload_date: "2025-01-15".into(),
            })
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_datasets().unwrap(), 1);
        assert_eq!(db.list_datasets().unwrap()[0].name, "Sales_2025");
    }
}
