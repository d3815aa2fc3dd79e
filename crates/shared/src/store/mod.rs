//! Storage abstraction over the two NoteHub backends.
//!
//! Handlers only ever see the [`Store`] trait; whether records live in an
//! in-memory map or in Postgres is decided once at startup.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{Note, NoteDraft, NotePatch, Tag, User};

/// CRUD operations over users, notes, and tags.
///
/// Ownership *checks* live in the HTTP handlers (they have the caller's
/// identity); the store only records ownership. Id assignment is the
/// store's job and must be monotonic regardless of deletions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend liveness check for health probes.
    async fn ping(&self) -> Result<(), StoreError>;

    // Users ------------------------------------------------------------

    /// Insert a new user. Fails with `Conflict` if the username or email is
    /// already registered; the store is left unchanged in that case.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    // Notes ------------------------------------------------------------

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError>;

    async fn notes_by_owner(&self, owner: &str) -> Result<Vec<Note>, StoreError>;

    async fn note(&self, id: i64) -> Result<Option<Note>, StoreError>;

    /// Create a note owned by `owner`. Stamps `created_at == updated_at`.
    /// Tags named in the draft are created under `owner` or reused by exact
    /// (case-sensitive) name match.
    async fn insert_note(&self, owner: &str, draft: NoteDraft) -> Result<Note, StoreError>;

    /// Apply a partial update and re-stamp `updated_at`.
    async fn update_note(&self, id: i64, patch: NotePatch) -> Result<Note, StoreError>;

    /// Remove a note and its tag associations; returns the removed note.
    async fn delete_note(&self, id: i64) -> Result<Note, StoreError>;

    /// Associate tags by name, creating missing ones under the note's
    /// owner. Idempotent per (note, tag) pair. `updated_at` is re-stamped
    /// only when the tag set actually changes.
    async fn attach_tags(&self, note_id: i64, names: &[String]) -> Result<Note, StoreError>;

    /// Remove associations by tag name. Names that are not currently
    /// associated are skipped.
    async fn detach_tags(&self, note_id: i64, names: &[String]) -> Result<Note, StoreError>;

    /// Case-insensitive substring search over title OR content. With no
    /// filters supplied the result is empty.
    async fn search_notes(
        &self,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Vec<Note>, StoreError>;

    // Tags -------------------------------------------------------------

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;

    async fn tags_by_owner(&self, owner: &str) -> Result<Vec<Tag>, StoreError>;

    async fn tag(&self, id: i64) -> Result<Option<Tag>, StoreError>;

    /// Create a tag. Fails with `Conflict` if `owner` already has a tag
    /// with this name.
    async fn insert_tag(&self, owner: &str, name: &str) -> Result<Tag, StoreError>;

    /// Rename a tag, keeping per-owner uniqueness.
    async fn rename_tag(&self, id: i64, name: &str) -> Result<Tag, StoreError>;

    /// Remove a tag and its note associations; returns the removed tag.
    async fn delete_tag(&self, id: i64) -> Result<Tag, StoreError>;

    /// Case-insensitive substring search by name; empty without a filter.
    async fn search_tags(&self, name: Option<&str>) -> Result<Vec<Tag>, StoreError>;
}
