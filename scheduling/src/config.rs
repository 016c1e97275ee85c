//! Booking engine configuration.

use std::time::Duration;

/// Booking engine settings.
///
/// # Example
///
/// ```
/// use service_portal_scheduling::BookingConfig;
/// use std::time::Duration;
///
/// let config = BookingConfig::new()
///     .with_meeting_timeout(Duration::from_secs(5))
///     .with_max_range_days(31);
/// assert_eq!(config.max_range_days, 31);
/// ```
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Upper bound on a meeting provider call; see [`Self::meeting_budget`]
    pub meeting_timeout: Duration,
    /// How long a caller waits for the engine to answer a command
    pub request_timeout: Duration,
    /// Widest date range `getAvailableSlots` accepts, in days
    pub max_range_days: u32,
    /// Draft reaper period
    pub reaper_interval: Duration,
}

impl BookingConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            meeting_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_range_days: 62,
            reaper_interval: Duration::from_secs(60),
        }
    }

    /// Set the meeting provider timeout.
    #[must_use]
    pub const fn with_meeting_timeout(mut self, timeout: Duration) -> Self {
        self.meeting_timeout = timeout;
        self
    }

    /// Set the command timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the widest accepted slot query range.
    #[must_use]
    pub const fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days;
        self
    }

    /// Time actually granted to a meeting provider call.
    ///
    /// The call runs before the booking reply, so it gets at most half of
    /// `request_timeout`. A committed booking is always answered in time.
    #[must_use]
    pub fn meeting_budget(&self) -> Duration {
        self.meeting_timeout.min(self.request_timeout / 2)
    }

    /// Set the reaper period.
    #[must_use]
    pub const fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self::new()
    }
}
