//! Guest session environment.

use crate::config::GuestAuthConfig;
use crate::providers::{IdentityRepository, OtpSender, PendingOtpStore};
use service_portal_core::environment::Clock;
use std::sync::Arc;

/// Dependencies of the guest session reducer.
///
/// Storage providers are generic so the reducer is monomorphised over the
/// concrete stores; the sender is chosen at runtime.
#[derive(Clone)]
pub struct GuestEnvironment<I, P>
where
    I: IdentityRepository + Clone,
    P: PendingOtpStore + Clone,
{
    /// Guest identities
    pub identities: I,
    /// Codes awaiting verification
    pub pending: P,
    /// Code delivery
    pub sender: Arc<dyn OtpSender>,
    /// Time source for expiry, lockouts and token age
    pub clock: Arc<dyn Clock>,
    /// Settings
    pub config: GuestAuthConfig,
}

impl<I, P> GuestEnvironment<I, P>
where
    I: IdentityRepository + Clone,
    P: PendingOtpStore + Clone,
{
    /// Assemble an environment.
    #[must_use]
    pub fn new(
        identities: I,
        pending: P,
        sender: Arc<dyn OtpSender>,
        clock: Arc<dyn Clock>,
        config: GuestAuthConfig,
    ) -> Self {
        Self {
            identities,
            pending,
            sender,
            clock,
            config,
        }
    }
}

impl<I, P> std::fmt::Debug for GuestEnvironment<I, P>
where
    I: IdentityRepository + Clone,
    P: PendingOtpStore + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
