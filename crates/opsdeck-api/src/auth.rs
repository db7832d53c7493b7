use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;

use opsdeck_auth::AuthManager;
use opsdeck_db::Database;
use opsdeck_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use opsdeck_types::models::UserIdentity;

use crate::advisor::Advisor;
use crate::middleware::Claims;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub auth: AuthManager,
    pub advisor: Advisor,
    pub jwt_secret: String,
    /// Directory holding the bundled sample CSVs for bulk import.
    pub data_dir: PathBuf,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let role = req.role.unwrap_or_default();
    let created = state
        .auth
        .register(&req.username, &req.password, role)
        .map_err(|e| {
            error!("Registration failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !created {
        return Err(StatusCode::CONFLICT);
    }

    // Round-trip through login so the fresh account gets its token the
    // same way every later session will.
    let identity = state
        .auth
        .login(&req.username, &req.password)
        .map_err(|e| {
            error!("Post-registration login failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = create_token(&state.jwt_secret, &identity)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: identity.id,
            username: identity.username,
            role: identity.role,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Unknown username and wrong password map to the same 401.
    let identity = state
        .auth
        .login(&req.username, &req.password)
        .map_err(|e| {
            error!("Login failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = create_token(&state.jwt_secret, &identity)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AuthResponse {
        user_id: identity.id,
        username: identity.username,
        role: identity.role,
        token,
    }))
}

fn create_token(secret: &str, identity: &UserIdentity) -> anyhow::Result<String> {
    let claims = Claims {
        sub: identity.id,
        username: identity.username.clone(),
        role: identity.role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use opsdeck_types::models::Role;

    #[test]
    fn token_round_trips_identity() {
        let identity = UserIdentity {
            id: 42,
            username: "analyst".into(),
            role: Role::Admin,
        };
        let token = create_token("test-secret", &identity).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, 42);
        assert_eq!(data.claims.username, "analyst");
        assert_eq!(data.claims.role, Role::Admin);
    }

    #[test]
    fn token_fails_with_wrong_secret() {
        let identity = UserIdentity {
            id: 1,
            username: "analyst".into(),
            role: Role::User,
        };
        let token = create_token("secret-a", &identity).unwrap();
        assert!(
            decode::<Claims>(
                &token,
                &DecodingKey::from_secret(b"secret-b"),
                &Validation::default(),
            )
            .is_err()
        );
    }
}
