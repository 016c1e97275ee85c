//! Guest identities, pending codes and the session reducer state.

use crate::config::OtpChannel;
use crate::error::Result;
use crate::validation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Guest identifier.
///
/// The same UUID is used as the booking identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(pub Uuid);

impl GuestId {
    /// Generate a new random guest id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GuestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of the one valid bearer token of a guest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredToken {
    /// SHA-256 hex of the token
    pub hash: String,
    /// When it was minted
    pub issued_at: DateTime<Utc>,
}

/// A person identified by document number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    /// Guest id
    pub id: GuestId,
    /// Unique document number
    pub document: String,
    /// Document type, e.g. `CC` or `passport`
    pub document_type: Option<String>,
    /// Full name
    pub full_name: String,
    /// Phone number as entered
    pub phone: Option<String>,
    /// Lowercased email
    pub email: Option<String>,
    /// Gender as entered
    pub gender: Option<String>,
    /// Current token hash, never serialized
    #[serde(skip)]
    pub token: Option<StoredToken>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl GuestIdentity {
    /// Build an identity from a validated form.
    #[must_use]
    pub fn from_form(form: RegistrationForm, now: DateTime<Utc>) -> Self {
        Self {
            id: GuestId::new(),
            document: form.document,
            document_type: form.document_type,
            full_name: form.full_name,
            phone: form.phone,
            email: form.email,
            gender: form.gender,
            token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a validated contact update. The document is never touched.
    pub fn apply(&mut self, update: ContactUpdate, now: DateTime<Utc>) {
        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(gender) = update.gender {
            self.gender = Some(gender);
        }
        self.updated_at = now;
    }
}

/// Registration payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    /// Document number
    pub document: String,
    /// Document type
    #[serde(default)]
    pub document_type: Option<String>,
    /// Full name
    pub full_name: String,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Gender
    #[serde(default)]
    pub gender: Option<String>,
}

impl RegistrationForm {
    /// Validate and normalise every field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Validation`] for the first invalid field.
    pub fn normalize(self) -> Result<Self> {
        Ok(Self {
            document: validation::validate_document(&self.document)?,
            document_type: optional_text(self.document_type),
            full_name: validation::validate_name(&self.full_name)?,
            phone: validation::validate_phone(self.phone.as_deref())?,
            email: validation::validate_email(self.email.as_deref())?,
            gender: optional_text(self.gender),
        })
    }
}

/// Fields a signed-in guest may change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    /// New full name
    #[serde(default)]
    pub full_name: Option<String>,
    /// New phone
    #[serde(default)]
    pub phone: Option<String>,
    /// New email
    #[serde(default)]
    pub email: Option<String>,
    /// New gender
    #[serde(default)]
    pub gender: Option<String>,
}

impl ContactUpdate {
    /// Validate and normalise the supplied fields. Blank fields are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Validation`] for the first invalid field.
    pub fn normalize(self) -> Result<Self> {
        let full_name = match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(validation::validate_name(name)?),
            _ => None,
        };
        Ok(Self {
            full_name,
            phone: validation::validate_phone(self.phone.as_deref())?,
            email: validation::validate_email(self.email.as_deref())?,
            gender: optional_text(self.gender),
        })
    }

    /// Whether nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.gender.is_none()
    }
}

fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|value| validation::sanitize_text(&value))
        .filter(|value| !value.is_empty())
}

/// Why a code was issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OtpPurpose {
    /// Sign-in of an existing guest
    Login {
        /// Guest signing in
        identity_id: GuestId,
    },
    /// Registration completed on verification
    Register {
        /// Validated payload
        form: Box<RegistrationForm>,
    },
}

/// A code waiting for verification, keyed by phone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingOtp {
    /// Phone the code was sent to
    pub phone: String,
    /// Document of the guest (secondary key)
    pub document: String,
    /// SHA-256 hex of the code
    pub code_hash: String,
    /// Channel used
    pub channel: OtpChannel,
    /// First issue time
    pub issued_at: DateTime<Utc>,
    /// Expiry of the current code
    pub expires_at: DateTime<Utc>,
    /// Wrong guesses so far
    pub attempts: u32,
    /// Last delivery time, for the resend cooldown
    pub last_sent_at: DateTime<Utc>,
    /// What a successful verification does
    pub purpose: OtpPurpose,
}

impl PendingOtp {
    /// Whether the code can no longer be used. It is still valid at
    /// exactly `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Result of an atomic verification attempt against the pending store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matched; the entry has been removed.
    Verified(Box<PendingOtp>),
    /// Wrong code; the attempt counter was incremented.
    Mismatch {
        /// Guesses left before lockout
        remaining: u32,
    },
    /// Wrong code and no guesses left; the entry has been removed.
    Exhausted,
    /// The code expired; the entry has been removed.
    Expired,
    /// Nothing pending for this phone.
    Missing,
}

/// Per-phone hourly request window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestWindow {
    /// First request of the window
    pub started_at: DateTime<Utc>,
    /// Codes issued in the window
    pub count: u32,
}

/// Session reducer state.
///
/// Identities and pending codes live in their stores; the reducer only
/// tracks the throttling that must be decided atomically.
#[derive(Clone, Debug, Default)]
pub struct GuestState {
    /// Phones locked after too many wrong codes, with the unlock time
    pub lockouts: HashMap<String, DateTime<Utc>>,
    /// The same lockouts keyed by document, since the pending code is gone
    /// once a phone locks
    pub document_lockouts: HashMap<String, DateTime<Utc>>,
    /// Hourly issuance windows per phone
    pub request_windows: HashMap<String, RequestWindow>,
}

impl GuestState {
    /// Remaining lockout for `phone`, if any.
    #[must_use]
    pub fn locked_for(&self, phone: &str, now: DateTime<Utc>) -> Option<chrono::Duration> {
        remaining(self.lockouts.get(phone), now)
    }

    /// Remaining lockout for the phone registered to `document`, if any.
    #[must_use]
    pub fn document_locked_for(
        &self,
        document: &str,
        now: DateTime<Utc>,
    ) -> Option<chrono::Duration> {
        remaining(self.document_lockouts.get(document), now)
    }
}

fn remaining(until: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> Option<chrono::Duration> {
    until.filter(|until| **until > now).map(|until| *until - now)
}
