use rusqlite::types::{Type, Value};

/// Database row types — these map directly to SQLite rows. The typed
/// entity records live in opsdeck-types; only the users table keeps a
/// separate row shape, because its credential column never crosses the
/// store boundary in API form.
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: Credential,
    pub role: String,
}

/// Stored password credential as SQLite hands it back. The column is
/// declared BLOB, but rows written by external tooling can hold the PHC
/// string as TEXT; both shapes normalize to bytes for verification.
#[derive(Debug, Clone)]
pub enum Credential {
    Bytes(Vec<u8>),
    Text(String),
}

impl Credential {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Credential::Bytes(b) => b,
            Credential::Text(s) => s.as_bytes(),
        }
    }

    pub(crate) fn from_sql_value(idx: usize, value: Value) -> rusqlite::Result<Self> {
        match value {
            Value::Blob(b) => Ok(Credential::Bytes(b)),
            Value::Text(s) => Ok(Credential::Text(s)),
            other => Err(rusqlite::Error::InvalidColumnType(
                idx,
                "password_hash".to_string(),
                match other {
                    Value::Null => Type::Null,
                    Value::Integer(_) => Type::Integer,
                    Value::Real(_) => Type::Real,
                    _ => Type::Text,
                },
            )),
        }
    }
}
