//! Error types for NoteHub storage

use thiserror::Error;

/// Errors surfaced by storage backends.
///
/// Both backends map their failure modes onto this enum so handlers never
/// see backend-specific error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}
