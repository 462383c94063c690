//! Text and email validation shared by request DTOs.

use crate::error::ValidationError;

/// Maximum length accepted for an email address (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;

/// Trim `value` and require it to be non-empty and at most `max` characters.
///
/// Returns the trimmed string on success.
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Like [`require_text`] for optional fields: `None` and blank strings
/// both normalize to `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => require_text(field, v, max).map(Some),
    }
}

/// Normalize and shape-check an email address.
///
/// Lowercases the address. Accepts exactly one `@`, a non-empty local part,
/// and a domain containing a dot that neither starts nor ends the domain.
pub fn normalize_email(value: &str) -> Result<String, ValidationError> {
    let email = value.trim().to_lowercase();
    let invalid = || ValidationError::InvalidEmail(value.trim().to_string());

    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(invalid());
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(email)
}
