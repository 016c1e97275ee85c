//! Pending one-time code store trait.

use crate::error::Result;
use crate::state::{PendingOtp, VerifyOutcome};
use chrono::{DateTime, Utc};

/// Codes waiting for verification, keyed by phone number.
///
/// Phone keys ignore formatting: `+57 300-123` and `+57300123` are the same
/// entry.
pub trait PendingOtpStore: Send + Sync {
    /// Store `pending`, replacing any entry for the same phone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn put(&self, pending: PendingOtp) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Find the entry issued for `document`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn find_by_document(
        &self,
        document: &str,
    ) -> impl std::future::Future<Output = Result<Option<PendingOtp>>> + Send;

    /// Check `code_hash` against the entry for `phone` as one atomic step.
    ///
    /// Removes the entry when it matches, when it has expired and when the
    /// attempt counter reaches `max_attempts`; otherwise increments the
    /// counter. Two concurrent calls with the right code yield exactly one
    /// [`VerifyOutcome::Verified`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn verify(
        &self,
        phone: &str,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> impl std::future::Future<Output = Result<VerifyOutcome>> + Send;

    /// Remove the entry for `phone`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn delete(&self, phone: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
