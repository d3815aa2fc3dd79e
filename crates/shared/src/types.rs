//! Domain types shared across the NoteHub platform.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A registered user.
///
/// Deliberately does not derive `Serialize`: the password hash must never
/// reach the wire. Handlers convert to a public view before responding.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique username, the identity key for ownership and token subjects.
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    /// Disabled accounts cannot log in or use authenticated endpoints.
    pub disabled: bool,
}

/// A note with its associated tags.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Username of the owner. Immutable after creation.
    pub owner: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub tags: Vec<Tag>,
}

/// A tag. Names are unique per owner, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub owner: String,
}

/// Input for creating a note. Tags are referenced by name; missing tags are
/// created under the note's owner, existing ones are reused by exact match.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update for a note. Only the fields that are present overwrite
/// existing values ("exclude unset" semantics).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}
