//! Application state for Axum handlers.

use service_portal_auth::{InMemoryGuestService, InMemoryRateLimiter};
use service_portal_runtime::metrics::PrometheusMetrics;
use service_portal_scheduling::BookingService;
use std::time::Duration;

/// Per-client-IP request limits of the unauthenticated write routes.
///
/// Each limit counts requests in a fixed window of [`Self::window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    /// Window length
    pub window: Duration,
    /// Guest registrations
    pub register: u32,
    /// Document lookups
    pub lookup: u32,
    /// Code requests and resends
    pub otp_request: u32,
    /// Code verifications
    pub verify: u32,
    /// Logouts
    pub logout: u32,
}

impl RateLimits {
    /// 60 s windows: register 20, lookup 30, code request/resend 10,
    /// verify 20, logout 20.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            window: Duration::from_secs(60),
            register: 20,
            lookup: 30,
            otp_request: 10,
            verify: 20,
            logout: 20,
        }
    }

    /// Set the window length.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the code request/resend limit.
    #[must_use]
    pub const fn with_otp_request(mut self, limit: u32) -> Self {
        self.otp_request = limit;
        self
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state shared across all HTTP handlers.
///
/// # Examples
///
/// ```ignore
/// let state = AppState::new(booking, guests);
/// let app = service_portal_web::router(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Booking engine
    pub booking: BookingService,
    /// Guest sessions
    pub guests: InMemoryGuestService,
    /// Per-IP limiter for the public write routes
    pub limiter: InMemoryRateLimiter,
    /// Limits applied by `limiter`
    pub limits: RateLimits,
    /// Prometheus handle rendered at `/metrics`, when installed
    pub metrics: Option<PrometheusMetrics>,
}

impl AppState {
    /// State with default limits and no metrics endpoint.
    #[must_use]
    pub fn new(booking: BookingService, guests: InMemoryGuestService) -> Self {
        Self {
            booking,
            guests,
            limiter: InMemoryRateLimiter::new(),
            limits: RateLimits::new(),
            metrics: None,
        }
    }

    /// Replace the limiter.
    #[must_use]
    pub fn with_limiter(mut self, limiter: InMemoryRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replace the limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: RateLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Serve `metrics` at `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: PrometheusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
