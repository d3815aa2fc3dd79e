//! Note endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use notehub_shared::{Note, NoteDraft, NotePatch};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::validate_id;
use crate::state::AppState;
use crate::validate;

/// Search filters; both are optional, both are substring matches.
#[derive(Debug, Deserialize)]
pub struct NoteSearchQuery {
    #[serde(rename = "note-title")]
    pub title: Option<String>,
    #[serde(rename = "note-content")]
    pub content: Option<String>,
}

/// Tag names for attach/detach operations.
#[derive(Debug, Deserialize)]
pub struct TagSelection {
    pub tags: Vec<String>,
}

/// GET /notes
pub async fn list_notes(State(state): State<AppState>) -> ApiResult<Json<Vec<Note>>> {
    Ok(Json(state.store.list_notes().await?))
}

/// GET /notes/search
pub async fn search_notes(
    State(state): State<AppState>,
    Query(query): Query<NoteSearchQuery>,
) -> ApiResult<Json<Vec<Note>>> {
    if let Some(title) = query.title.as_deref() {
        validate::search_term("note-title", title, 10)?;
    }
    if let Some(content) = query.content.as_deref() {
        validate::search_term("note-content", content, 20)?;
    }

    let notes = state
        .store
        .search_notes(query.title.as_deref(), query.content.as_deref())
        .await?;
    Ok(Json(notes))
}

/// GET /notes/:note_id
pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
) -> ApiResult<Json<Note>> {
    validate_id(note_id)?;
    let note = state.store.note(note_id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(note))
}

/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<NoteDraft>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    validate::note_title(&draft.title)?;
    validate::note_content(&draft.content)?;
    for name in &draft.tags {
        validate::tag_name(name)?;
    }

    let note = state.store.insert_note(&user.username, draft).await?;
    tracing::info!(note_id = note.id, owner = %note.owner, "note created");
    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /notes/:note_id
pub async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<i64>,
    Json(patch): Json<NotePatch>,
) -> ApiResult<Json<Note>> {
    if let Some(title) = patch.title.as_deref() {
        validate::note_title(title)?;
    }
    if let Some(content) = patch.content.as_deref() {
        validate::note_content(content)?;
    }

    owned_note(&state, note_id, &user.username).await?;
    let note = state.store.update_note(note_id, patch).await?;
    Ok(Json(note))
}

/// DELETE /notes/:note_id
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<i64>,
) -> ApiResult<Json<Note>> {
    owned_note(&state, note_id, &user.username).await?;
    let note = state.store.delete_note(note_id).await?;
    tracing::info!(note_id, owner = %user.username, "note deleted");
    Ok(Json(note))
}

/// PUT /notes/:note_id/tags
pub async fn attach_tags(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<i64>,
    Json(selection): Json<TagSelection>,
) -> ApiResult<Json<Note>> {
    for name in &selection.tags {
        validate::tag_name(name)?;
    }

    owned_note(&state, note_id, &user.username).await?;
    let note = state.store.attach_tags(note_id, &selection.tags).await?;
    Ok(Json(note))
}

/// DELETE /notes/:note_id/tags
pub async fn detach_tags(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<i64>,
    Json(selection): Json<TagSelection>,
) -> ApiResult<Json<Note>> {
    for name in &selection.tags {
        validate::tag_name(name)?;
    }

    let note = owned_note(&state, note_id, &user.username).await?;
    if note.tags.is_empty() {
        return Err(ApiError::BadRequest(
            "Note has no tags to remove".to_string(),
        ));
    }

    let note = state.store.detach_tags(note_id, &selection.tags).await?;
    Ok(Json(note))
}

/// Fetch a note and confirm the caller owns it. Unknown id is a 404 before
/// any ownership question arises.
async fn owned_note(state: &AppState, note_id: i64, username: &str) -> ApiResult<Note> {
    validate_id(note_id)?;
    let note = state.store.note(note_id).await?.ok_or(ApiError::NotFound)?;
    if note.owner != username {
        return Err(ApiError::Forbidden);
    }
    Ok(note)
}
