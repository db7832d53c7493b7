use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tracing::warn;

use opsdeck_db::models::Credential;
use opsdeck_db::{Database, rusqlite};
use opsdeck_types::models::{Role, UserIdentity};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(anyhow::Error),
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Stateless registration and login over the users table. Construction is
/// cheap and idempotent: the schema is created (if absent) when the shared
/// [`Database`] is opened, so a manager can be built per request.
#[derive(Clone)]
pub struct AuthManager {
    db: Arc<Database>,
}

impl AuthManager {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new account. Returns `Ok(false)`, with no store
    /// mutation, when the username or password is empty or the username
    /// is already taken; other store failures propagate.
    pub fn register(&self, username: &str, password: &str, role: Role) -> Result<bool, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Ok(false);
        }

        // Argon2id with a fresh random salt per call
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(AuthError::Hash)?
            .to_string();

        match self.db.create_user(username, hash.as_bytes(), role.as_str()) {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AuthError::Database(e)),
        }
    }

    /// Authenticate a username/password pair. Empty input, unknown
    /// username, an undecodable stored credential, and a wrong password
    /// all collapse to `Ok(None)`, so the outcomes are indistinguishable
    /// at the interface. Only store lookup errors propagate. The returned
    /// identity never carries the hash.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<UserIdentity>, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Ok(None);
        }

        let Some(row) = self
            .db
            .get_user_by_username(username)
            .map_err(AuthError::Database)?
        else {
            return Ok(None);
        };

        if !verify_credential(&row.password_hash, password) {
            return Ok(None);
        }

        let role = row.role.parse().unwrap_or_else(|_| {
            warn!("User {} has unrecognized role {:?}; treating as user", row.id, row.role);
            Role::User
        });

        Ok(Some(UserIdentity {
            id: row.id,
            username: row.username,
            role,
        }))
    }
}

/// Normalize the stored credential to bytes and verify. Any decode or
/// parse problem is an authentication failure, never a propagated error.
fn verify_credential(credential: &Credential, password: &str) -> bool {
    let Ok(phc) = std::str::from_utf8(credential.as_bytes()) else {
        return false;
    };
    let Ok(parsed) = PasswordHash::new(phc) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
