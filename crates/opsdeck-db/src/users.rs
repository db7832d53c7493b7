use anyhow::Result;
use rusqlite::OptionalExtension;

use crate::Database;
use crate::models::{Credential, UserRow};

impl Database {
    /// Insert a new user row and return its store-assigned id. A duplicate
    /// username surfaces as the underlying unique-constraint error; the
    /// auth layer decides how to present that.
    pub fn create_user(&self, username: &str, password_hash: &[u8], role: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
                rusqlite::params![username, password_hash, role],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password_hash, role FROM users WHERE username = ?1",
            )?;

            let row = stmt
                .query_row([username], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: Credential::from_sql_value(2, row.get(2)?)?,
                        role: row.get(3)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(count)
        })
    }
}
