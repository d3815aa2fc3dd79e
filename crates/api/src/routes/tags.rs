//! Tag endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use notehub_shared::Tag;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::validate_id;
use crate::state::AppState;
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct TagSearchQuery {
    #[serde(rename = "tag-name")]
    pub name: Option<String>,
}

/// Payload for creating or renaming a tag.
#[derive(Debug, Deserialize)]
pub struct TagBody {
    pub name: String,
}

/// GET /tags
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.store.list_tags().await?))
}

/// GET /tags/search
pub async fn search_tags(
    State(state): State<AppState>,
    Query(query): Query<TagSearchQuery>,
) -> ApiResult<Json<Vec<Tag>>> {
    if let Some(name) = query.name.as_deref() {
        validate::search_term("tag-name", name, 10)?;
    }
    Ok(Json(state.store.search_tags(query.name.as_deref()).await?))
}

/// GET /tags/:tag_id
pub async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
) -> ApiResult<Json<Tag>> {
    validate_id(tag_id)?;
    let tag = state.store.tag(tag_id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(tag))
}

/// POST /tags
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<TagBody>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    validate::tag_name(&body.name)?;
    let tag = state.store.insert_tag(&user.username, &body.name).await?;
    tracing::info!(tag_id = tag.id, owner = %tag.owner, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PUT /tags/:tag_id
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tag_id): Path<i64>,
    Json(body): Json<TagBody>,
) -> ApiResult<Json<Tag>> {
    validate::tag_name(&body.name)?;
    owned_tag(&state, tag_id, &user.username).await?;
    let tag = state.store.rename_tag(tag_id, &body.name).await?;
    Ok(Json(tag))
}

/// DELETE /tags/:tag_id
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tag_id): Path<i64>,
) -> ApiResult<Json<Tag>> {
    owned_tag(&state, tag_id, &user.username).await?;
    let tag = state.store.delete_tag(tag_id).await?;
    tracing::info!(tag_id, owner = %user.username, "tag deleted");
    Ok(Json(tag))
}

async fn owned_tag(state: &AppState, tag_id: i64, username: &str) -> ApiResult<Tag> {
    validate_id(tag_id)?;
    let tag = state.store.tag(tag_id).await?.ok_or(ApiError::NotFound)?;
    if tag.owner != username {
        return Err(ApiError::Forbidden);
    }
    Ok(tag)
}
