//! Input validation and sanitisation for guest-supplied fields.

use crate::error::{GuestError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::unwrap_used)] // literal patterns
static DOCUMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]{4,20}$").unwrap());

#[allow(clippy::unwrap_used)]
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

#[allow(clippy::unwrap_used)]
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap());

#[allow(clippy::unwrap_used)]
static INJECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(<\s*script|javascript:|on\w+\s*=|<[^>]*>|--",
        r"|;\s*(drop|delete|insert|update|select)\b|\bunion\s+select\b)",
    ))
    .unwrap()
});

const MAX_EMAIL_LEN: usize = 254;
const MAX_TEXT_LEN: usize = 500;

/// Trim and check a document number.
///
/// # Errors
///
/// Returns [`GuestError::Validation`] unless the document has 4 to 20
/// letters, digits or hyphens.
pub fn validate_document(raw: &str) -> Result<String> {
    let document = raw.trim();
    if document.is_empty() {
        return Err(GuestError::Validation("Document number is required".into()));
    }
    if !DOCUMENT_RE.is_match(document) {
        return Err(GuestError::Validation(
            "Document number must be 4 to 20 letters, digits or hyphens".into(),
        ));
    }
    Ok(document.to_string())
}

/// Normalise an optional email. Blank input is `None`.
///
/// # Errors
///
/// Returns [`GuestError::Validation`] for a malformed or overlong address.
pub fn validate_email(raw: Option<&str>) -> Result<Option<String>> {
    let Some(email) = raw.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    let email = email.to_lowercase();
    if email.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(&email) {
        return Err(GuestError::Validation("Invalid email address".into()));
    }
    Ok(Some(email))
}

/// Check an optional phone number. Separators are ignored for validation,
/// the trimmed original is kept.
///
/// # Errors
///
/// Returns [`GuestError::Validation`] unless the number has an optional
/// leading `+` and 7 to 15 digits.
pub fn validate_phone(raw: Option<&str>) -> Result<Option<String>> {
    let Some(phone) = raw.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if !PHONE_RE.is_match(&strip_phone_separators(phone)) {
        return Err(GuestError::Validation("Invalid phone number".into()));
    }
    Ok(Some(phone.to_string()))
}

/// Remove ` -().` from a phone number.
#[must_use]
pub fn strip_phone_separators(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

/// Check a person's name.
///
/// # Errors
///
/// Returns [`GuestError::Validation`] for names shorter than 2 or longer
/// than 140 characters, or containing markup or query fragments.
pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(2..=140).contains(&len) {
        return Err(GuestError::Validation(
            "Name must be between 2 and 140 characters".into(),
        ));
    }
    if INJECTION_RE.is_match(name) {
        return Err(GuestError::Validation("Name contains invalid characters".into()));
    }
    Ok(name.to_string())
}

/// Trim, drop control characters and truncate free text to 500 characters.
#[must_use]
pub fn sanitize_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .take(MAX_TEXT_LEN)
        .collect()
}
