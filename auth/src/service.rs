//! Request/response facade over the guest session store.

use crate::actions::{GuestAction, GuestSession, OtpDelivery};
use crate::config::{OtpChannel, PublicOtpSettings};
use crate::environment::GuestEnvironment;
use crate::error::{GuestError, Result};
use crate::providers::{IdentityRepository, PendingOtpStore};
use crate::reducers::GuestSessionReducer;
use crate::state::{ContactUpdate, GuestId, GuestIdentity, GuestState, RegistrationForm};
use crate::stores::{InMemoryIdentityRepository, InMemoryPendingOtpStore};
use serde::Serialize;
use service_portal_runtime::{Store, StoreError};
use std::sync::Arc;
use uuid::Uuid;

/// Store running the guest session reducer.
pub type GuestStore<I, P> =
    Store<GuestState, GuestAction, GuestEnvironment<I, P>, GuestSessionReducer<I, P>>;

/// Session service over the in-memory stores.
pub type InMemoryGuestService =
    GuestSessionService<InMemoryIdentityRepository, InMemoryPendingOtpStore>;

/// Result of registration or sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignInOutcome {
    /// Signed in; the token is ready.
    Authenticated(GuestSession),
    /// A code was sent and must be verified.
    RequiresOtp(OtpDelivery),
}

/// Guest session entry point used by the HTTP layer.
pub struct GuestSessionService<I, P>
where
    I: IdentityRepository + Clone + 'static,
    P: PendingOtpStore + Clone + 'static,
{
    store: Arc<GuestStore<I, P>>,
}

impl<I, P> Clone for GuestSessionService<I, P>
where
    I: IdentityRepository + Clone + 'static,
    P: PendingOtpStore + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<I, P> GuestSessionService<I, P>
where
    I: IdentityRepository + Clone + 'static,
    P: PendingOtpStore + Clone + 'static,
{
    /// Start a store over `env`.
    #[must_use]
    pub fn new(env: GuestEnvironment<I, P>) -> Self {
        tracing::info!(otp_enabled = env.config.otp.enabled, "Guest session engine started");
        let store = Store::new(GuestState::default(), GuestSessionReducer::new(), env);
        Self {
            store: Arc::new(store),
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<GuestStore<I, P>> {
        &self.store
    }

    /// OTP settings safe to show to clients.
    #[must_use]
    pub fn otp_settings(&self) -> PublicOtpSettings {
        self.store.environment().config.otp.public()
    }

    async fn dispatch(&self, command: impl FnOnce(Uuid) -> GuestAction) -> Result<GuestAction> {
        let correlation_id = Uuid::new_v4();
        let timeout = self.store.environment().config.request_timeout;

        let reply = self
            .store
            .send_and_wait_for(
                command(correlation_id),
                |action| action.is_terminal_for(&correlation_id),
                timeout,
            )
            .await
            .map_err(|e| match e {
                StoreError::Timeout => GuestError::Timeout,
                other => GuestError::Unavailable(other.to_string()),
            })?;

        let result = match reply {
            GuestAction::Failed { error, .. } => Err(error),
            other => Ok(other),
        };
        record_metrics(&result);
        result
    }

    /// Register a guest.
    ///
    /// With codes disabled the guest is created and signed in. With codes
    /// enabled a code is sent and the guest is created on verification.
    ///
    /// # Errors
    ///
    /// - [`GuestError::Validation`]: invalid field, or no phone with codes enabled
    /// - [`GuestError::Conflict`]: the document is already registered
    /// - [`GuestError::RateLimited`] / [`GuestError::Locked`]: phone throttled
    /// - [`GuestError::Delivery`]: the code could not be sent
    pub async fn register(
        &self,
        form: RegistrationForm,
        channel: Option<OtpChannel>,
    ) -> Result<SignInOutcome> {
        let reply = self
            .dispatch(|correlation_id| GuestAction::Register {
                correlation_id,
                form,
                channel,
            })
            .await?;
        sign_in_outcome(reply)
    }

    /// Sign in by document number.
    ///
    /// # Errors
    ///
    /// - [`GuestError::NotFound`]: no guest with this document
    /// - [`GuestError::Validation`]: no phone registered while codes are enabled
    /// - the throttling and delivery errors of [`Self::register`]
    pub async fn lookup_by_document(&self, document: &str) -> Result<SignInOutcome> {
        let document = document.to_string();
        let reply = self
            .dispatch(|correlation_id| GuestAction::LookupByDocument {
                correlation_id,
                document,
            })
            .await?;
        sign_in_outcome(reply)
    }

    /// Send a sign-in code on `channel`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lookup_by_document`], plus [`GuestError::Validation`]
    /// when codes are disabled.
    pub async fn request_otp(
        &self,
        document: &str,
        channel: Option<OtpChannel>,
    ) -> Result<OtpDelivery> {
        let document = document.to_string();
        let reply = self
            .dispatch(|correlation_id| GuestAction::RequestOtp {
                correlation_id,
                document,
                channel,
            })
            .await?;
        otp_delivery(reply)
    }

    /// Send a new code for the pending entry of `document`.
    ///
    /// # Errors
    ///
    /// - [`GuestError::Authentication`]: nothing pending
    /// - [`GuestError::RateLimited`]: cooldown or hourly limit
    /// - [`GuestError::Locked`]: phone locked
    /// - [`GuestError::Delivery`]: the code could not be sent
    pub async fn resend_otp(&self, document: &str) -> Result<OtpDelivery> {
        let document = document.to_string();
        let reply = self
            .dispatch(|correlation_id| GuestAction::ResendOtp {
                correlation_id,
                document,
            })
            .await?;
        otp_delivery(reply)
    }

    /// Verify a code and sign the guest in.
    ///
    /// # Errors
    ///
    /// - [`GuestError::Authentication`]: wrong, expired, missing or reused code
    /// - [`GuestError::Locked`]: too many wrong codes
    /// - [`GuestError::Conflict`]: the document was registered meanwhile
    pub async fn verify_otp(&self, document: &str, code: &str) -> Result<GuestSession> {
        let document = document.to_string();
        let code = code.to_string();
        let reply = self
            .dispatch(|correlation_id| GuestAction::VerifyOtp {
                correlation_id,
                document,
                code,
            })
            .await;
        if matches!(reply, Err(GuestError::Authentication(_))) {
            metrics::counter!("otp.verify.failed.total").increment(1);
        }
        match reply? {
            GuestAction::Authenticated { session, .. } => Ok(*session),
            other => Err(unexpected(&other)),
        }
    }

    /// Resolve a bearer token to its guest.
    ///
    /// # Errors
    ///
    /// Returns [`GuestError::Authentication`] for a missing, unknown or
    /// stale token.
    pub async fn validate_token(&self, token: &str) -> Result<GuestIdentity> {
        let token = token.to_string();
        match self
            .dispatch(|correlation_id| GuestAction::ValidateToken {
                correlation_id,
                token,
            })
            .await?
        {
            GuestAction::TokenValidated { identity, .. } => Ok(*identity),
            other => Err(unexpected(&other)),
        }
    }

    /// Invalidate the token of `identity_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GuestError::NotFound`] for an unknown guest.
    pub async fn logout(&self, identity_id: GuestId) -> Result<()> {
        match self
            .dispatch(|correlation_id| GuestAction::Logout {
                correlation_id,
                identity_id,
            })
            .await?
        {
            GuestAction::LoggedOut { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Change contact fields of `identity_id`.
    ///
    /// # Errors
    ///
    /// - [`GuestError::Validation`]: invalid field or nothing to change
    /// - [`GuestError::NotFound`]: unknown guest
    pub async fn update_contact(
        &self,
        identity_id: GuestId,
        update: ContactUpdate,
    ) -> Result<GuestIdentity> {
        match self
            .dispatch(|correlation_id| GuestAction::UpdateContact {
                correlation_id,
                identity_id,
                update,
            })
            .await?
        {
            GuestAction::ContactUpdated { identity, .. } => Ok(*identity),
            other => Err(unexpected(&other)),
        }
    }
}

fn sign_in_outcome(reply: GuestAction) -> Result<SignInOutcome> {
    match reply {
        GuestAction::Authenticated { session, .. } => Ok(SignInOutcome::Authenticated(*session)),
        GuestAction::OtpIssued { delivery, .. } => Ok(SignInOutcome::RequiresOtp(delivery)),
        other => Err(unexpected(&other)),
    }
}

fn otp_delivery(reply: GuestAction) -> Result<OtpDelivery> {
    match reply {
        GuestAction::OtpIssued { delivery, .. } => Ok(delivery),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(action: &GuestAction) -> GuestError {
    tracing::error!(?action, "Unexpected reply from guest session store");
    GuestError::Unavailable("unexpected reply".into())
}

fn record_metrics(result: &Result<GuestAction>) {
    match result {
        Ok(GuestAction::OtpIssued { .. }) => {
            metrics::counter!("otp.issued.total").increment(1);
        },
        Ok(GuestAction::Authenticated { .. }) => {
            metrics::counter!("guest.tokens.issued.total").increment(1);
        },
        Err(GuestError::Locked { .. }) => {
            metrics::counter!("otp.locked.total").increment(1);
        },
        _ => {},
    }
}
