//! NoteHub Shared Types and Storage
//!
//! This crate contains the domain types, the storage abstraction, and both
//! storage backends (in-memory and Postgres) shared across NoteHub.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use store::{MemoryStore, PgStore, Store};
pub use types::*;
