//! Registration, login, and the current-user endpoint.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use time::Duration;

use notehub_shared::User;

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validate;

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub password: String,
}

/// Public view of a user. The password hash never leaves the store layer.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued-token response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

/// POST /registration
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    validate::username(&payload.username)?;
    validate::email(&payload.email)?;
    validate::password(&payload.password)?;

    let password_hash = hash_password(&payload.password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        ApiError::Internal
    })?;

    let user = User {
        username: payload.username,
        email: payload.email.to_lowercase(),
        full_name: payload.full_name,
        password_hash,
        disabled: false,
    };

    let created = state.store.insert_user(user).await.map_err(|e| {
        match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict("Username or email already registered".to_string())
            }
            other => other,
        }
    })?;

    tracing::info!(username = %created.username, "user registered");

    // Fire-and-forget; registration never waits on the mail provider.
    let email = state.email.clone();
    let to = created.email.clone();
    let username = created.username.clone();
    tokio::spawn(async move {
        email.send_welcome(&to, &username).await;
    });

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state
        .store
        .user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let valid = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        tracing::error!(error = %e, "stored password hash is unreadable");
        ApiError::Internal
    })?;
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    if user.disabled {
        return Err(ApiError::InactiveUser);
    }

    let minutes = state.config.access_token_expire_minutes;
    let token = state
        .jwt
        .issue(&user.username, Some(Duration::minutes(minutes)))
        .map_err(|e| {
            tracing::error!(error = %e, "token issuance failed");
            ApiError::Internal
        })?;

    tracing::debug!(username = %user.username, "login succeeded");

    Ok(Json(AuthResponse {
        access_token: token,
        token_type: "bearer",
        expires_in: minutes * 60,
    }))
}

/// GET /users/me
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse {
        username: user.username,
        email: user.email,
        full_name: user.full_name,
    })
}
