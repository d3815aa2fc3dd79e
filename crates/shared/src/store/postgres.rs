//! Postgres storage backend.
//!
//! Multi-step writes run inside a per-request transaction; unique
//! violations surface as [`StoreError::Conflict`]. Join rows are removed by
//! `ON DELETE CASCADE`, so deletes never leave dangling associations.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::error::StoreError;
use crate::types::{Note, NoteDraft, NotePatch, Tag, User};

use super::Store;

/// PostgreSQL unique violation error code.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct UserRow {
    username: String,
    email: String,
    full_name: Option<String>,
    password_hash: String,
    disabled: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            password_hash: row.password_hash,
            disabled: row.disabled,
        }
    }
}

#[derive(Debug, FromRow)]
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    owner: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: i64,
    name: String,
    owner: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            owner: row.owner,
        }
    }
}

#[derive(Debug, FromRow)]
struct LinkedTagRow {
    note_id: i64,
    id: i64,
    name: String,
    owner: String,
}

/// Map a sqlx error, turning unique violations into a domain conflict.
fn db_err(conflict_message: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(e) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict(conflict_message.to_string())
        }
        _ => {
            tracing::error!(error = %err, "database error");
            StoreError::Database(err.to_string())
        }
    }
}

fn internal(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "database error");
    StoreError::Database(err.to_string())
}

/// Build an ILIKE pattern matching `query` as a literal substring. `%`,
/// `_`, and `\` are LIKE metacharacters, so they are escaped; queries
/// using this pair it with `ESCAPE '\'`.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Store backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn assemble(&self, rows: Vec<NoteRow>) -> Result<Vec<Note>, StoreError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let linked: Vec<LinkedTagRow> = sqlx::query_as(
            r#"
            SELECT nt.note_id, t.id, t.name, t.owner
            FROM note_tags nt
            JOIN tags t ON t.id = nt.tag_id
            WHERE nt.note_id = ANY($1)
            ORDER BY t.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;

        let mut by_note: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in linked {
            by_note.entry(row.note_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
                owner: row.owner,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_note.remove(&row.id).unwrap_or_default();
                Note {
                    id: row.id,
                    title: row.title,
                    content: row.content,
                    owner: row.owner,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                    tags,
                }
            })
            .collect())
    }

    async fn assemble_one(&self, row: NoteRow) -> Result<Note, StoreError> {
        let mut notes = self.assemble(vec![row]).await?;
        notes.pop().ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (username, email, full_name, password_hash, disabled)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.disabled)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Username or email already registered", e))?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT username, email, full_name, password_hash, disabled
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT username, email, full_name, password_hash, disabled
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        let rows: Vec<NoteRow> = sqlx::query_as(
            "SELECT id, title, content, owner, created_at, updated_at FROM notes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        self.assemble(rows).await
    }

    async fn notes_by_owner(&self, owner: &str) -> Result<Vec<Note>, StoreError> {
        let rows: Vec<NoteRow> = sqlx::query_as(
            r#"
            SELECT id, title, content, owner, created_at, updated_at
            FROM notes
            WHERE owner = $1
            ORDER BY id
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        self.assemble(rows).await
    }

    async fn note(&self, id: i64) -> Result<Option<Note>, StoreError> {
        let row: Option<NoteRow> = sqlx::query_as(
            "SELECT id, title, content, owner, created_at, updated_at FROM notes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;

        match row {
            Some(row) => Ok(Some(self.assemble_one(row).await?)),
            None => Ok(None),
        }
    }

    async fn insert_note(&self, owner: &str, draft: NoteDraft) -> Result<Note, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await.map_err(internal)?;

        let (note_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO notes (owner, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(internal)?;

        for name in &draft.tags {
            let (tag_id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO tags (owner, name)
                VALUES ($1, $2)
                ON CONFLICT (owner, name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(owner)
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(internal)?;

            sqlx::query(
                "INSERT INTO note_tags (note_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(note_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
        }

        tx.commit().await.map_err(internal)?;
        self.note(note_id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_note(&self, id: i64, patch: NotePatch) -> Result<Note, StoreError> {
        let row: Option<NoteRow> = sqlx::query_as(
            r#"
            UPDATE notes
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                updated_at = $4
            WHERE id = $1
            RETURNING id, title, content, owner, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.content)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;

        let row = row.ok_or(StoreError::NotFound)?;
        self.assemble_one(row).await
    }

    async fn delete_note(&self, id: i64) -> Result<Note, StoreError> {
        let note = self.note(id).await?.ok_or(StoreError::NotFound)?;
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(note)
    }

    async fn attach_tags(&self, note_id: i64, names: &[String]) -> Result<Note, StoreError> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        let owner: Option<(String,)> =
            sqlx::query_as("SELECT owner FROM notes WHERE id = $1 FOR UPDATE")
                .bind(note_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(internal)?;
        let (owner,) = owner.ok_or(StoreError::NotFound)?;

        let mut changed = false;
        for name in names {
            let (tag_id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO tags (owner, name)
                VALUES ($1, $2)
                ON CONFLICT (owner, name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(&owner)
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(internal)?;

            let inserted = sqlx::query(
                "INSERT INTO note_tags (note_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(note_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
            changed |= inserted.rows_affected() > 0;
        }

        if changed {
            sqlx::query("UPDATE notes SET updated_at = $2 WHERE id = $1")
                .bind(note_id)
                .bind(OffsetDateTime::now_utc())
                .execute(&mut *tx)
                .await
                .map_err(internal)?;
        }

        tx.commit().await.map_err(internal)?;
        self.note(note_id).await?.ok_or(StoreError::NotFound)
    }

    async fn detach_tags(&self, note_id: i64, names: &[String]) -> Result<Note, StoreError> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        let owner: Option<(String,)> =
            sqlx::query_as("SELECT owner FROM notes WHERE id = $1 FOR UPDATE")
                .bind(note_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(internal)?;
        let (owner,) = owner.ok_or(StoreError::NotFound)?;

        let removed = sqlx::query(
            r#"
            DELETE FROM note_tags nt
            USING tags t
            WHERE nt.tag_id = t.id
              AND nt.note_id = $1
              AND t.owner = $2
              AND t.name = ANY($3)
            "#,
        )
        .bind(note_id)
        .bind(&owner)
        .bind(names)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;

        if removed.rows_affected() > 0 {
            sqlx::query("UPDATE notes SET updated_at = $2 WHERE id = $1")
                .bind(note_id)
                .bind(OffsetDateTime::now_utc())
                .execute(&mut *tx)
                .await
                .map_err(internal)?;
        }

        tx.commit().await.map_err(internal)?;
        self.note(note_id).await?.ok_or(StoreError::NotFound)
    }

    async fn search_notes(
        &self,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Vec<Note>, StoreError> {
        if title.is_none() && content.is_none() {
            return Ok(Vec::new());
        }
        let title_pattern = title.map(like_pattern);
        let content_pattern = content.map(like_pattern);

        let rows: Vec<NoteRow> = sqlx::query_as(
            r#"
            SELECT id, title, content, owner, created_at, updated_at
            FROM notes
            WHERE ($1::text IS NOT NULL AND title ILIKE $1 ESCAPE '\')
               OR ($2::text IS NOT NULL AND content ILIKE $2 ESCAPE '\')
            ORDER BY id
            "#,
        )
        .bind(title_pattern)
        .bind(content_pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        self.assemble(rows).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let rows: Vec<TagRow> = sqlx::query_as("SELECT id, name, owner FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn tags_by_owner(&self, owner: &str) -> Result<Vec<Tag>, StoreError> {
        let rows: Vec<TagRow> =
            sqlx::query_as("SELECT id, name, owner FROM tags WHERE owner = $1 ORDER BY id")
                .bind(owner)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn tag(&self, id: i64) -> Result<Option<Tag>, StoreError> {
        let row: Option<TagRow> = sqlx::query_as("SELECT id, name, owner FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.map(Tag::from))
    }

    async fn insert_tag(&self, owner: &str, name: &str) -> Result<Tag, StoreError> {
        let row: TagRow = sqlx::query_as(
            "INSERT INTO tags (owner, name) VALUES ($1, $2) RETURNING id, name, owner",
        )
        .bind(owner)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("Tag already exists", e))?;
        Ok(row.into())
    }

    async fn rename_tag(&self, id: i64, name: &str) -> Result<Tag, StoreError> {
        let row: Option<TagRow> =
            sqlx::query_as("UPDATE tags SET name = $2 WHERE id = $1 RETURNING id, name, owner")
                .bind(id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_err("Tag already exists", e))?;
        row.map(Tag::from).ok_or(StoreError::NotFound)
    }

    async fn delete_tag(&self, id: i64) -> Result<Tag, StoreError> {
        let tag = self.tag(id).await?.ok_or(StoreError::NotFound)?;
        sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(tag)
    }

    async fn search_tags(&self, name: Option<&str>) -> Result<Vec<Tag>, StoreError> {
        let Some(name) = name else {
            return Ok(Vec::new());
        };
        let pattern = like_pattern(name);
        let rows: Vec<TagRow> =
            sqlx::query_as(r"SELECT id, name, owner FROM tags WHERE name ILIKE $1 ESCAPE '\' ORDER BY id")
                .bind(pattern)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }
}
