//! User listings and the per-caller note/tag views.

use axum::{extract::State, Extension, Json};

use notehub_shared::{Note, Tag};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::routes::auth::UserResponse;
use crate::state::AppState;

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/me/notes
pub async fn my_notes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Note>>> {
    let notes = state.store.notes_by_owner(&user.username).await?;
    Ok(Json(notes))
}

/// GET /users/me/tags
pub async fn my_tags(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Tag>>> {
    let tags = state.store.tags_by_owner(&user.username).await?;
    Ok(Json(tags))
}
