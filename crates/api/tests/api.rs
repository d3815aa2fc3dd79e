//! End-to-end tests over the in-memory backend.
//!
//! Each test builds a full router and drives it with `tower::ServiceExt`,
//! exercising routing, the auth gate, validation, and handler semantics
//! without a network listener or a database.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use notehub_api::{routes::create_router, AppState, Config};
use notehub_shared::{MemoryStore, Store};

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        database_url: None,
        jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
        access_token_expire_minutes: 30,
    }
}

/// Router plus a handle to the backing store for out-of-band tweaks.
fn app_with_store() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(test_config(), store.clone() as Arc<dyn Store>);
    (create_router(state), store)
}

fn app() -> Router {
    app_with_store().0
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str, email: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/registration",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "full_name": format!("{username} Tester"),
            "password": "Secret123",
        })),
    )
    .await
}

async fn login_token(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": username, "password": "Secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

#[tokio::test]
async fn test_registration_returns_public_view() {
    let app = app();
    let (status, body) = register(&app, "alice", "Alice@Example.com").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    // Email is normalized to lowercase.
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["full_name"], "alice Tester");
    // Neither the password nor its hash appears anywhere in the response.
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts_and_leaves_store_unchanged() {
    let app = app();
    let (status, _) = register(&app, "alice", "alice@example.com").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, "alice", "other@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");

    let (status, users) = send(&app, "GET", "/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_login_issues_bearer_token() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-guess" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Incorrect username or password");

    // Unknown user gets the same answer as a wrong password.
    let (status, body) = send(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "nobody", "password": "Secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Incorrect username or password");

    let (status, body) = send(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "Secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 30 * 60);
    assert!(!body["access_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_me_reflects_the_token_subject() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;
    let token = login_token(&app, "alice").await;

    let (status, body) = send(&app, "GET", "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn test_protected_routes_reject_missing_and_malformed_tokens() {
    let app = app();

    let (status, body) = send(&app, "GET", "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Could not validate credentials");

    let (status, _) = send(&app, "GET", "/users/me", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Token signed with a different secret.
    let (status, _) = send(
        &app,
        "GET",
        "/users/me",
        Some(concat!(
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.",
            "eyJzdWIiOiJhbGljZSIsImlhdCI6MCwiZXhwIjo5OTk5OTk5OTk5fQ.",
            "c2lnbmF0dXJlLW1hZGUtdXA"
        )),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_note_ownership_lifecycle() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;
    register(&app, "bob", "bob@example.com").await;
    let alice = login_token(&app, "alice").await;
    let bob = login_token(&app, "bob").await;

    let (status, note) = send(
        &app,
        "POST",
        "/notes",
        Some(&alice),
        Some(json!({ "title": "Groceries", "content": "Milk and eggs", "tags": ["errands"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["owner"], "alice");
    assert_eq!(note["created_at"], note["updated_at"]);
    assert_eq!(note["tags"][0]["name"], "errands");
    let note_id = note["id"].as_i64().unwrap();

    // Anyone can read it.
    let (status, fetched) = send(&app, "GET", &format!("/notes/{note_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Groceries");

    // Bob cannot modify Alice's note, and the note is untouched afterwards.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/notes/{note_id}"),
        Some(&bob),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, fetched) = send(&app, "GET", &format!("/notes/{note_id}"), None, None).await;
    assert_eq!(fetched["title"], "Groceries");

    // Partial update by the owner changes only the supplied field.
    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/notes/{note_id}"),
        Some(&alice),
        Some(json!({ "content": "Milk, eggs, bread" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Groceries");
    assert_eq!(updated["content"], "Milk, eggs, bread");
    assert_ne!(updated["created_at"], updated["updated_at"]);

    // Bob cannot delete it either.
    let (status, _) = send(&app, "DELETE", &format!("/notes/{note_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner's delete returns the removed note, after which reads 404.
    let (status, removed) =
        send(&app, "DELETE", &format!("/notes/{note_id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["id"], note_id);

    let (status, _) = send(&app, "GET", &format!("/notes/{note_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attach_is_idempotent_and_detach_requires_tags() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;
    let token = login_token(&app, "alice").await;

    let (_, note) = send(
        &app,
        "POST",
        "/notes",
        Some(&token),
        Some(json!({ "title": "Reading list", "content": "Some books", "tags": ["books"] })),
    )
    .await;
    let note_id = note["id"].as_i64().unwrap();

    // Attaching an already-attached tag does not duplicate it.
    let (status, tagged) = send(
        &app,
        "PUT",
        &format!("/notes/{note_id}/tags"),
        Some(&token),
        Some(json!({ "tags": ["books", "library"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tagged["tags"].as_array().unwrap().len(), 2);

    // Detach both.
    let (status, bare) = send(
        &app,
        "DELETE",
        &format!("/notes/{note_id}/tags"),
        Some(&token),
        Some(json!({ "tags": ["books", "library"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bare["tags"].as_array().unwrap().is_empty());

    // Detaching from a note with no tags is a client error.
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/notes/{note_id}/tags"),
        Some(&token),
        Some(json!({ "tags": ["books"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn test_note_search_filters() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;
    let token = login_token(&app, "alice").await;

    for (title, content) in [
        ("Groceries", "Milk and eggs"),
        ("Workout", "Morning run plan"),
    ] {
        let (status, _) = send(
            &app,
            "POST",
            "/notes",
            Some(&token),
            Some(json!({ "title": title, "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // Case-insensitive substring match on the title.
    let (status, found) = send(&app, "GET", "/notes/search?note-title=groc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "Groceries");

    // Filters combine as OR across title and content.
    let (status, found) = send(
        &app,
        "GET",
        "/notes/search?note-title=groc&note-content=morning",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 2);

    // No filters means no results, not all results.
    let (status, found) = send(&app, "GET", "/notes/search", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(found.as_array().unwrap().is_empty());

    // Filter terms carry their own length bounds.
    let (status, body) = send(&app, "GET", "/notes/search?note-title=ab", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_tag_crud_scoped_per_owner() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;
    register(&app, "bob", "bob@example.com").await;
    let alice = login_token(&app, "alice").await;
    let bob = login_token(&app, "bob").await;

    let (status, tag) = send(
        &app,
        "POST",
        "/tags",
        Some(&alice),
        Some(json!({ "name": "work" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tag["owner"], "alice");
    let tag_id = tag["id"].as_i64().unwrap();

    // Same name under the same owner conflicts.
    let (status, _) = send(
        &app,
        "POST",
        "/tags",
        Some(&alice),
        Some(json!({ "name": "work" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A different owner can reuse the name.
    let (status, bobs) = send(
        &app,
        "POST",
        "/tags",
        Some(&bob),
        Some(json!({ "name": "work" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bobs["owner"], "bob");

    // Bob cannot rename Alice's tag.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/tags/{tag_id}"),
        Some(&bob),
        Some(json!({ "name": "stolen" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, renamed) = send(
        &app,
        "PUT",
        &format!("/tags/{tag_id}"),
        Some(&alice),
        Some(json!({ "name": "projects" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "projects");

    let (status, removed) =
        send(&app, "DELETE", &format!("/tags/{tag_id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["id"], tag_id);

    let (status, _) = send(&app, "GET", &format!("/tags/{tag_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_my_notes_and_tags_are_caller_scoped() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;
    register(&app, "bob", "bob@example.com").await;
    let alice = login_token(&app, "alice").await;
    let bob = login_token(&app, "bob").await;

    send(
        &app,
        "POST",
        "/notes",
        Some(&alice),
        Some(json!({ "title": "Mine", "content": "Alice's note", "tags": ["personal"] })),
    )
    .await;
    send(
        &app,
        "POST",
        "/notes",
        Some(&bob),
        Some(json!({ "title": "Also mine", "content": "Bob's note" })),
    )
    .await;

    let (status, notes) = send(&app, "GET", "/users/me/notes", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes.as_array().unwrap().len(), 1);
    assert_eq!(notes[0]["owner"], "alice");

    let (status, tags) = send(&app, "GET", "/users/me/tags", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags.as_array().unwrap().len(), 1);
    assert_eq!(tags[0]["name"], "personal");

    let (_, tags) = send(&app, "GET", "/users/me/tags", Some(&bob), None).await;
    assert!(tags.as_array().unwrap().is_empty());

    // The global listing shows everything.
    let (_, all) = send(&app, "GET", "/notes", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_disabled_account_is_locked_out() {
    let (app, store) = app_with_store();
    register(&app, "alice", "alice@example.com").await;
    let token = login_token(&app, "alice").await;

    store.set_user_disabled("alice", true).await.unwrap();

    // An already-issued token stops working at the gate.
    let (status, body) = send(&app, "GET", "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Inactive user");

    // And new logins are refused the same way.
    let (status, body) = send(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "Secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Inactive user");
}

#[tokio::test]
async fn test_validation_failures_are_bad_requests() {
    let app = app();

    // Username must start with a letter.
    let (status, body) = send(
        &app,
        "POST",
        "/registration",
        None,
        Some(json!({
            "username": "1alice",
            "email": "alice@example.com",
            "password": "Secret123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "POST",
        "/registration",
        None,
        Some(json!({
            "username": "alice",
            "email": "not-an-email",
            "password": "Secret123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/registration",
        None,
        Some(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "short",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    register(&app, "alice", "alice@example.com").await;
    let token = login_token(&app, "alice").await;

    let (status, _) = send(
        &app,
        "POST",
        "/notes",
        Some(&token),
        Some(json!({ "title": "ab", "content": "Too short a title" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A failed creation must not leave anything behind.
    let (_, notes) = send(&app, "GET", "/notes", None, None).await;
    assert!(notes.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_and_invalid_ids() {
    let app = app();
    register(&app, "alice", "alice@example.com").await;
    let token = login_token(&app, "alice").await;

    let (status, _) = send(&app, "GET", "/notes/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/notes/0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/notes/999",
        Some(&token),
        Some(json!({ "title": "Anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app();

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "healthy");

    let (status, _) = send(&app, "GET", "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
