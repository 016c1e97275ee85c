//! Injected dependencies of the booking reducer.

use crate::config::BookingConfig;
use crate::providers::{AppointmentRepository, MeetingProvider};
use service_portal_core::environment::Clock;
use std::sync::Arc;

/// Booking environment
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Time source for expiry and "in the future" checks
    pub clock: Arc<dyn Clock>,
    /// Write-through appointment storage
    pub repository: Arc<dyn AppointmentRepository>,
    /// Meeting link creation
    pub meetings: Arc<dyn MeetingProvider>,
    /// Engine settings
    pub config: BookingConfig,
}

impl BookingEnvironment {
    /// Create an environment.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        repository: Arc<dyn AppointmentRepository>,
        meetings: Arc<dyn MeetingProvider>,
        config: BookingConfig,
    ) -> Self {
        Self {
            clock,
            repository,
            meetings,
            config,
        }
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
