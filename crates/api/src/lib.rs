//! NoteHub API Library
//!
//! This crate contains the HTTP server components for NoteHub.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod routes;
pub mod state;
pub mod validate;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
