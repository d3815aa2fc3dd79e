//! Request authentication middleware.
//!
//! The auth gate for every protected route: extracts the bearer token,
//! verifies it, resolves the subject to a user, and threads the resulting
//! identity into the request as an [`AuthUser`] extension. Handlers take
//! the identity as an explicit `Extension<AuthUser>` argument; there is no
//! ambient request state.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller identity, resolved from a verified token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// Middleware enforcing authentication on the protected route set.
///
/// Failure modes, in order: missing/malformed header or bad token -> 401
/// ("Could not validate credentials"); unknown subject -> 401; disabled
/// account -> 400 ("Inactive user").
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::InvalidToken)?;

    let subject = state.jwt.verify(&token).map_err(|e| {
        tracing::debug!(error = %e, "token verification failed");
        ApiError::InvalidToken
    })?;

    let user = state
        .store
        .user_by_username(&subject)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    if user.disabled {
        return Err(ApiError::InactiveUser);
    }

    request.extensions_mut().insert(AuthUser {
        username: user.username,
        email: user.email,
        full_name: user.full_name,
    });

    Ok(next.run(request).await)
}

/// Extract the token from a `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
