//! In-memory storage backend.
//!
//! Replaces the classic "global list of dictionaries" mock store with a
//! guarded map behind the [`Store`] trait. Ids come from atomic counters,
//! so they stay monotonic under concurrent writers and are never reused
//! after a deletion.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{Note, NoteDraft, NotePatch, Tag, User};

use super::Store;

#[derive(Debug, Clone)]
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    owner: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    notes: BTreeMap<i64, NoteRow>,
    tags: BTreeMap<i64, Tag>,
    /// (note_id, tag_id) pairs; uniqueness of an association falls out of
    /// the set representation.
    links: BTreeSet<(i64, i64)>,
}

impl Inner {
    fn assemble(&self, row: &NoteRow) -> Note {
        let tags = self
            .links
            .range((row.id, i64::MIN)..=(row.id, i64::MAX))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();

        Note {
            id: row.id,
            title: row.title.clone(),
            content: row.content.clone(),
            owner: row.owner.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            tags,
        }
    }

    fn tag_id_by_name(&self, owner: &str, name: &str) -> Option<i64> {
        self.tags
            .values()
            .find(|t| t.owner == owner && t.name == name)
            .map(|t| t.id)
    }
}

/// Thread-safe in-memory store.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    note_seq: AtomicI64,
    tag_seq: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            note_seq: AtomicI64::new(1),
            tag_seq: AtomicI64::new(1),
        }
    }

    /// Flip a user's disabled flag. There is no HTTP surface for this;
    /// operators (and tests) reach it directly.
    pub async fn set_user_disabled(&self, username: &str, disabled: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(username).ok_or(StoreError::NotFound)?;
        user.disabled = disabled;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let taken = inner.users.contains_key(&user.username)
            || inner.users.values().any(|u| u.email == user.email);
        if taken {
            return Err(StoreError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        inner.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.notes.values().map(|row| inner.assemble(row)).collect())
    }

    async fn notes_by_owner(&self, owner: &str) -> Result<Vec<Note>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .notes
            .values()
            .filter(|row| row.owner == owner)
            .map(|row| inner.assemble(row))
            .collect())
    }

    async fn note(&self, id: i64) -> Result<Option<Note>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.notes.get(&id).map(|row| inner.assemble(row)))
    }

    async fn insert_note(&self, owner: &str, draft: NoteDraft) -> Result<Note, StoreError> {
        let mut inner = self.inner.write().await;
        let id = self.note_seq.fetch_add(1, Ordering::Relaxed);
        let now = OffsetDateTime::now_utc();
        let row = NoteRow {
            id,
            title: draft.title,
            content: draft.content,
            owner: owner.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.notes.insert(id, row);

        for name in &draft.tags {
            let tag_id = match inner.tag_id_by_name(owner, name) {
                Some(tag_id) => tag_id,
                None => {
                    let tag_id = self.tag_seq.fetch_add(1, Ordering::Relaxed);
                    inner.tags.insert(
                        tag_id,
                        Tag {
                            id: tag_id,
                            name: name.clone(),
                            owner: owner.to_string(),
                        },
                    );
                    tag_id
                }
            };
            inner.links.insert((id, tag_id));
        }

        let row = inner.notes.get(&id).cloned().ok_or(StoreError::NotFound)?;
        Ok(inner.assemble(&row))
    }

    async fn update_note(&self, id: i64, patch: NotePatch) -> Result<Note, StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner.notes.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(content) = patch.content {
            row.content = content;
        }
        row.updated_at = OffsetDateTime::now_utc();
        let row = row.clone();
        Ok(inner.assemble(&row))
    }

    async fn delete_note(&self, id: i64) -> Result<Note, StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner.notes.get(&id).cloned().ok_or(StoreError::NotFound)?;
        let note = inner.assemble(&row);
        inner.notes.remove(&id);
        inner.links.retain(|(note_id, _)| *note_id != id);
        Ok(note)
    }

    async fn attach_tags(&self, note_id: i64, names: &[String]) -> Result<Note, StoreError> {
        let mut inner = self.inner.write().await;
        let owner = inner
            .notes
            .get(&note_id)
            .map(|row| row.owner.clone())
            .ok_or(StoreError::NotFound)?;

        let mut changed = false;
        for name in names {
            let tag_id = match inner.tag_id_by_name(&owner, name) {
                Some(tag_id) => tag_id,
                None => {
                    let tag_id = self.tag_seq.fetch_add(1, Ordering::Relaxed);
                    inner.tags.insert(
                        tag_id,
                        Tag {
                            id: tag_id,
                            name: name.clone(),
                            owner: owner.clone(),
                        },
                    );
                    tag_id
                }
            };
            changed |= inner.links.insert((note_id, tag_id));
        }

        if changed {
            if let Some(row) = inner.notes.get_mut(&note_id) {
                row.updated_at = OffsetDateTime::now_utc();
            }
        }

        let row = inner
            .notes
            .get(&note_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        Ok(inner.assemble(&row))
    }

    async fn detach_tags(&self, note_id: i64, names: &[String]) -> Result<Note, StoreError> {
        let mut inner = self.inner.write().await;
        let owner = inner
            .notes
            .get(&note_id)
            .map(|row| row.owner.clone())
            .ok_or(StoreError::NotFound)?;

        let mut changed = false;
        for name in names {
            if let Some(tag_id) = inner.tag_id_by_name(&owner, name) {
                changed |= inner.links.remove(&(note_id, tag_id));
            }
        }

        if changed {
            if let Some(row) = inner.notes.get_mut(&note_id) {
                row.updated_at = OffsetDateTime::now_utc();
            }
        }

        let row = inner
            .notes
            .get(&note_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        Ok(inner.assemble(&row))
    }

    async fn search_notes(
        &self,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Vec<Note>, StoreError> {
        if title.is_none() && content.is_none() {
            return Ok(Vec::new());
        }
        let title = title.map(str::to_lowercase);
        let content = content.map(str::to_lowercase);

        let inner = self.inner.read().await;
        Ok(inner
            .notes
            .values()
            .filter(|row| {
                let title_hit = title
                    .as_deref()
                    .is_some_and(|q| row.title.to_lowercase().contains(q));
                let content_hit = content
                    .as_deref()
                    .is_some_and(|q| row.content.to_lowercase().contains(q));
                title_hit || content_hit
            })
            .map(|row| inner.assemble(row))
            .collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.tags.values().cloned().collect())
    }

    async fn tags_by_owner(&self, owner: &str) -> Result<Vec<Tag>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tags
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect())
    }

    async fn tag(&self, id: i64) -> Result<Option<Tag>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.tags.get(&id).cloned())
    }

    async fn insert_tag(&self, owner: &str, name: &str) -> Result<Tag, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.tag_id_by_name(owner, name).is_some() {
            return Err(StoreError::Conflict("Tag already exists".to_string()));
        }
        let id = self.tag_seq.fetch_add(1, Ordering::Relaxed);
        let tag = Tag {
            id,
            name: name.to_string(),
            owner: owner.to_string(),
        };
        inner.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn rename_tag(&self, id: i64, name: &str) -> Result<Tag, StoreError> {
        let mut inner = self.inner.write().await;
        let owner = inner
            .tags
            .get(&id)
            .map(|t| t.owner.clone())
            .ok_or(StoreError::NotFound)?;
        if let Some(existing) = inner.tag_id_by_name(&owner, name) {
            if existing != id {
                return Err(StoreError::Conflict("Tag already exists".to_string()));
            }
        }
        let tag = inner.tags.get_mut(&id).ok_or(StoreError::NotFound)?;
        tag.name = name.to_string();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: i64) -> Result<Tag, StoreError> {
        let mut inner = self.inner.write().await;
        let tag = inner.tags.remove(&id).ok_or(StoreError::NotFound)?;
        inner.links.retain(|(_, tag_id)| *tag_id != id);
        Ok(tag)
    }

    async fn search_tags(&self, name: Option<&str>) -> Result<Vec<Tag>, StoreError> {
        let Some(name) = name else {
            return Ok(Vec::new());
        };
        let query = name.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .tags
            .values()
            .filter(|t| t.name.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }
}
