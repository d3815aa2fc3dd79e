//! Input validation
//!
//! Field constraints live here as plain functions, invoked by handlers
//! before any entity is constructed or persisted. A validation failure
//! never partially mutates state.

use crate::error::ApiError;

/// Username: 3-16 chars, a letter followed by letters, digits, underscores.
pub fn username(value: &str) -> Result<(), ApiError> {
    identifier("Username", value, 3, 16)
}

/// Password: 8-16 chars, same shape as usernames.
pub fn password(value: &str) -> Result<(), ApiError> {
    identifier("Password", value, 8, 16)
}

fn identifier(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    let mut chars = value.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::Validation(format!(
            "{} must start with a letter followed by letters, numbers, and underscores",
            field
        )));
    }
    Ok(())
}

/// Email: 5-50 chars with a structurally plausible local@domain.tld shape.
pub fn email(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < 5 || len > 50 || !is_valid_email(value) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || local.len() > 64 {
        return false;
    }
    // No leading/trailing/consecutive dots
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_alphanumeric() || ".+-_%".contains(c))
    {
        return false;
    }

    // Domain needs at least one dot and a 2+ char TLD
    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return false;
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return false;
    }
    domain
        .rsplit('.')
        .next()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
}

pub fn note_title(value: &str) -> Result<(), ApiError> {
    length("Note title", value, 3, 20)
}

pub fn note_content(value: &str) -> Result<(), ApiError> {
    length("Note content", value, 3, 1000)
}

pub fn tag_name(value: &str) -> Result<(), ApiError> {
    length("Tag name", value, 3, 20)
}

/// Search filters carry their own per-parameter length bounds.
pub fn search_term(param: &str, value: &str, max: usize) -> Result<(), ApiError> {
    length(param, value, 3, max)
}

fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}
