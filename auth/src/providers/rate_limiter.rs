//! Rate limiter trait.

use crate::error::Result;
use std::time::Duration;

/// Fixed-window request limiter.
///
/// The HTTP layer keys it by action and client IP.
///
/// # Example
///
/// ```no_run
/// use service_portal_auth::providers::RateLimiter;
/// use std::time::Duration;
///
/// # async fn example(limiter: impl RateLimiter) -> Result<(), Box<dyn std::error::Error>> {
/// limiter
///     .check_and_record("register:203.0.113.7", 20, Duration::from_secs(60))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key` and fail once more than `max_attempts`
    /// requests fall in the current window.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::RateLimited`] when the limit is exceeded.
    fn check_and_record(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Forget all requests for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GuestError::Storage`] if the backend fails.
    fn reset(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
