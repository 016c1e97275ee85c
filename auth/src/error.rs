//! Error types for guest session operations.

use thiserror::Error;

/// Result type alias for guest session operations.
pub type Result<T> = std::result::Result<T, GuestError>;

/// Error taxonomy for guest registration, one-time codes and tokens.
///
/// Messages of user errors are shown to the guest as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuestError {
    // ═══════════════════════════════════════════════════════════
    // User errors
    // ═══════════════════════════════════════════════════════════
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or stale credentials.
    #[error("{0}")]
    Authentication(String),

    /// No guest with this document.
    #[error("{0}")]
    NotFound(String),

    /// Registration collides with an existing guest.
    #[error("{0}")]
    Conflict(String),

    /// Too many requests, a resend cooldown, or a locked phone.
    #[error("{message}")]
    RateLimited {
        /// Guest-facing message
        message: String,
        /// Seconds until a retry can succeed
        retry_after_secs: u64,
    },

    /// Too many wrong codes; the phone is locked for a while.
    #[error("Account is temporarily locked. Please try again in {minutes} minutes")]
    Locked {
        /// Whole minutes left, rounded up
        minutes: u64,
        /// Seconds until the lockout ends
        retry_after_secs: u64,
    },

    // ═══════════════════════════════════════════════════════════
    // System errors
    // ═══════════════════════════════════════════════════════════
    /// The code could not be delivered.
    #[error("Could not deliver the verification code: {0}")]
    Delivery(String),

    /// A repository or store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The session engine did not answer in time.
    #[error("Timed out waiting for the session engine")]
    Timeout,

    /// The session engine is shutting down.
    #[error("Session engine unavailable: {0}")]
    Unavailable(String),
}

impl GuestError {
    /// Returns `true` if this error is due to the caller's input or state.
    ///
    /// # Examples
    ///
    /// ```
    /// # use service_portal_auth::GuestError;
    /// assert!(GuestError::Authentication("No OTP was requested".into()).is_user_error());
    /// assert!(!GuestError::Timeout.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Authentication(_)
                | Self::NotFound(_)
                | Self::Conflict(_)
                | Self::RateLimited { .. }
                | Self::Locked { .. }
        )
    }

    /// Rate-limit error with a "try again in N minutes" message.
    #[must_use]
    pub fn retry_in_minutes(prefix: &str, retry_after_secs: u64) -> Self {
        let minutes = minutes_rounded_up(retry_after_secs);
        Self::RateLimited {
            message: format!("{prefix}. Please try again in {minutes} minutes"),
            retry_after_secs,
        }
    }

    /// Lockout error for the remaining seconds.
    #[must_use]
    pub fn locked(retry_after_secs: u64) -> Self {
        Self::Locked {
            minutes: minutes_rounded_up(retry_after_secs),
            retry_after_secs,
        }
    }

    /// Seconds a client should wait before retrying, if known.
    #[must_use]
    pub const fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            }
            | Self::Locked {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

const fn minutes_rounded_up(secs: u64) -> u64 {
    let minutes = secs.div_ceil(60);
    if minutes == 0 { 1 } else { minutes }
}
