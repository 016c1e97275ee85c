//! Guest session actions.
//!
//! Commands come from the HTTP layer, feedback actions from effects, and
//! terminal actions carry the reply for the caller waiting on the
//! correlation id.

use crate::config::OtpChannel;
use crate::error::{GuestError, Result};
use crate::state::{
    ContactUpdate, GuestId, GuestIdentity, PendingOtp, RegistrationForm, VerifyOutcome,
};
use serde::Serialize;
use uuid::Uuid;

/// Where a freshly issued code was sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OtpDelivery {
    /// Masked destination
    pub masked_phone: String,
    /// Channel used
    pub channel: OtpChannel,
    /// Minutes until the code expires
    pub expiry_minutes: u32,
}

/// A signed-in guest with a freshly minted token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GuestSession {
    /// Plain bearer token, shown once
    pub token: String,
    /// The guest
    pub identity: GuestIdentity,
}

/// What to do once the pending code of a document is loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingIntent {
    /// Send a new code
    Resend,
    /// Check a submitted code
    Verify {
        /// SHA-256 hex of the submitted code
        code_hash: String,
    },
}

/// Actions of the guest session reducer.
#[derive(Clone, Debug)]
pub enum GuestAction {
    // ═══════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════
    /// Register a new guest.
    Register {
        /// Correlation id
        correlation_id: Uuid,
        /// Registration payload
        form: RegistrationForm,
        /// Channel for the code, default when `None`
        channel: Option<OtpChannel>,
    },

    /// Sign in by document number.
    LookupByDocument {
        /// Correlation id
        correlation_id: Uuid,
        /// Document number
        document: String,
    },

    /// Send a sign-in code on a chosen channel.
    RequestOtp {
        /// Correlation id
        correlation_id: Uuid,
        /// Document number
        document: String,
        /// Channel, default when `None`
        channel: Option<OtpChannel>,
    },

    /// Send a new code for the pending entry of a document.
    ResendOtp {
        /// Correlation id
        correlation_id: Uuid,
        /// Document number
        document: String,
    },

    /// Check a submitted code.
    VerifyOtp {
        /// Correlation id
        correlation_id: Uuid,
        /// Document number
        document: String,
        /// Submitted code
        code: String,
    },

    /// Resolve a bearer token to its guest.
    ValidateToken {
        /// Correlation id
        correlation_id: Uuid,
        /// Plain token
        token: String,
    },

    /// Invalidate the token of a guest.
    Logout {
        /// Correlation id
        correlation_id: Uuid,
        /// Signed-in guest
        identity_id: GuestId,
    },

    /// Change contact fields of a guest.
    UpdateContact {
        /// Correlation id
        correlation_id: Uuid,
        /// Signed-in guest
        identity_id: GuestId,
        /// Fields to change
        update: ContactUpdate,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Effect feedback
    // ═══════════════════════════════════════════════════════════════════
    /// Duplicate check of a registration finished.
    RegistrationChecked {
        /// Correlation id
        correlation_id: Uuid,
        /// Normalised payload
        form: Box<RegistrationForm>,
        /// Requested channel
        channel: Option<OtpChannel>,
        /// Guest already holding the document
        existing: Result<Option<GuestIdentity>>,
    },

    /// Sign-in lookup finished.
    IdentityLoaded {
        /// Correlation id
        correlation_id: Uuid,
        /// Requested channel
        channel: Option<OtpChannel>,
        /// Guest found
        result: Result<Option<GuestIdentity>>,
    },

    /// Pending code of a document loaded.
    PendingLoaded {
        /// Correlation id
        correlation_id: Uuid,
        /// Document the entry was looked up by
        document: String,
        /// Next step
        intent: PendingIntent,
        /// Entry found
        result: Result<Option<PendingOtp>>,
    },

    /// Atomic verification finished.
    OtpChecked {
        /// Correlation id
        correlation_id: Uuid,
        /// Document of the checked entry
        document: String,
        /// Phone of the checked entry
        phone: String,
        /// Outcome
        result: Result<VerifyOutcome>,
    },

    /// Token lookup finished.
    TokenChecked {
        /// Correlation id
        correlation_id: Uuid,
        /// Guest holding the token
        result: Result<Option<GuestIdentity>>,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Terminal results
    // ═══════════════════════════════════════════════════════════════════
    /// A code was sent; the caller must verify it.
    OtpIssued {
        /// Correlation id
        correlation_id: Uuid,
        /// Delivery details
        delivery: OtpDelivery,
    },

    /// The guest is signed in with a new token.
    Authenticated {
        /// Correlation id
        correlation_id: Uuid,
        /// Session
        session: Box<GuestSession>,
    },

    /// A token resolved to its guest.
    TokenValidated {
        /// Correlation id
        correlation_id: Uuid,
        /// The guest
        identity: Box<GuestIdentity>,
    },

    /// The token was cleared.
    LoggedOut {
        /// Correlation id
        correlation_id: Uuid,
    },

    /// Contact fields were changed.
    ContactUpdated {
        /// Correlation id
        correlation_id: Uuid,
        /// Updated guest
        identity: Box<GuestIdentity>,
    },

    /// The command failed.
    Failed {
        /// Correlation id
        correlation_id: Uuid,
        /// Reason
        error: GuestError,
    },
}

impl GuestAction {
    /// Correlation id of any action.
    #[must_use]
    pub const fn correlation_id(&self) -> Uuid {
        match self {
            Self::Register { correlation_id, .. }
            | Self::LookupByDocument { correlation_id, .. }
            | Self::RequestOtp { correlation_id, .. }
            | Self::ResendOtp { correlation_id, .. }
            | Self::VerifyOtp { correlation_id, .. }
            | Self::ValidateToken { correlation_id, .. }
            | Self::Logout { correlation_id, .. }
            | Self::UpdateContact { correlation_id, .. }
            | Self::RegistrationChecked { correlation_id, .. }
            | Self::IdentityLoaded { correlation_id, .. }
            | Self::PendingLoaded { correlation_id, .. }
            | Self::OtpChecked { correlation_id, .. }
            | Self::TokenChecked { correlation_id, .. }
            | Self::OtpIssued { correlation_id, .. }
            | Self::Authenticated { correlation_id, .. }
            | Self::TokenValidated { correlation_id, .. }
            | Self::LoggedOut { correlation_id }
            | Self::ContactUpdated { correlation_id, .. }
            | Self::Failed { correlation_id, .. } => *correlation_id,
        }
    }

    /// Whether this action ends a command.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::OtpIssued { .. }
                | Self::Authenticated { .. }
                | Self::TokenValidated { .. }
                | Self::LoggedOut { .. }
                | Self::ContactUpdated { .. }
                | Self::Failed { .. }
        )
    }

    /// Whether this action ends the command with `correlation_id`.
    #[must_use]
    pub fn is_terminal_for(&self, correlation_id: &Uuid) -> bool {
        self.is_terminal() && self.correlation_id() == *correlation_id
    }
}
