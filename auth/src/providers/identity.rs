//! Guest identity repository trait.

use crate::error::Result;
use crate::state::{ContactUpdate, GuestId, GuestIdentity, StoredToken};
use chrono::{DateTime, Utc};

/// Storage of guest identities.
///
/// Document numbers are unique. The token is only ever replaced as a whole
/// through [`IdentityRepository::set_token`], which keeps at most one valid
/// token per guest.
pub trait IdentityRepository: Send + Sync {
    /// Find a guest by document number.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn find_by_document(
        &self,
        document: &str,
    ) -> impl std::future::Future<Output = Result<Option<GuestIdentity>>> + Send;

    /// Find a guest by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn find_by_id(
        &self,
        id: GuestId,
    ) -> impl std::future::Future<Output = Result<Option<GuestIdentity>>> + Send;

    /// Find the guest whose current token hash equals `token_hash`.
    ///
    /// Implementations compare hashes in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<GuestIdentity>>> + Send;

    /// Insert a new guest.
    ///
    /// # Errors
    ///
    /// - [`crate::GuestError::Conflict`]: the document is already registered
    /// - [`crate::GuestError::Storage`]: backend failure
    fn insert(
        &self,
        identity: GuestIdentity,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Replace the stored token, or clear it with `None`.
    ///
    /// # Errors
    ///
    /// - [`crate::GuestError::NotFound`]: unknown guest
    /// - [`crate::GuestError::Storage`]: backend failure
    fn set_token(
        &self,
        id: GuestId,
        token: Option<StoredToken>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Apply a validated contact update and return the new identity.
    ///
    /// # Errors
    ///
    /// - [`crate::GuestError::NotFound`]: unknown guest
    /// - [`crate::GuestError::Storage`]: backend failure
    fn update_contact(
        &self,
        id: GuestId,
        update: ContactUpdate,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<GuestIdentity>> + Send;
}
