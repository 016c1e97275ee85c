//! HTTP request handlers, one module per area.

pub mod appointments;
pub mod guests;
pub mod health;
pub mod otp;
pub mod slots;

use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::state::AppState;
use serde::Deserialize;
use service_portal_auth::providers::RateLimiter;

pub use health::{health_check, metrics_export, readiness};

/// Body of write routes that carry nothing but the honeypot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoneypotOnly {
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Count one request of `action` from `client_ip` against `limit`.
async fn enforce_limit(
    state: &AppState,
    action: &str,
    client_ip: &ClientIp,
    limit: u32,
) -> Result<(), AppError> {
    let key = format!("{action}:{}", client_ip.0);
    state
        .limiter
        .check_and_record(&key, limit, state.limits.window)
        .await
        .map_err(|err| {
            tracing::warn!(action, client_ip = %client_ip.0, "Client rate limit exceeded");
            AppError::from(err)
        })
}
