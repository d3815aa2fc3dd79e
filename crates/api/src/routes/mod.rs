//! HTTP routing
//!
//! Routes are split into a public set and a protected set; the protected
//! set carries the auth gate as a route layer so the middleware never
//! touches public traffic. Reads are public. Mutations check ownership in
//! the handler and resolve the resource first, so an unknown id is a 404
//! even for callers who would not be allowed to touch it.

pub mod auth;
pub mod health;
pub mod notes;
pub mod tags;
pub mod users;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::require_auth;
use crate::error::ApiError;
use crate::state::AppState;

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/registration", post(auth::register))
        .route("/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/notes", get(notes::list_notes))
        .route("/notes/search", get(notes::search_notes))
        .route("/notes/:note_id", get(notes::get_note))
        .route("/tags", get(tags::list_tags))
        .route("/tags/search", get(tags::search_tags))
        .route("/tags/:tag_id", get(tags::get_tag));

    let protected = Router::new()
        .route("/users/me", get(auth::me))
        .route("/users/me/notes", get(users::my_notes))
        .route("/users/me/tags", get(users::my_tags))
        .route("/notes", post(notes::create_note))
        .route(
            "/notes/:note_id",
            put(notes::update_note).delete(notes::delete_note),
        )
        .route(
            "/notes/:note_id/tags",
            put(notes::attach_tags).delete(notes::detach_tags),
        )
        .route("/tags", post(tags::create_tag))
        .route(
            "/tags/:tag_id",
            put(tags::update_tag).delete(tags::delete_tag),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(health::router())
        .merge(public)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Ids are assigned starting from 1; anything below that cannot exist.
pub(crate) fn validate_id(id: i64) -> Result<(), ApiError> {
    if id < 1 {
        return Err(ApiError::BadRequest(format!("Invalid id: {id}")));
    }
    Ok(())
}
