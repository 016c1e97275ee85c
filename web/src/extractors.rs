//! Custom Axum extractors.
//!
//! - `CorrelationId`: request correlation id (middleware, header, or new)
//! - `ClientIp`: client address from proxy headers
//! - `UserAgent`: the `User-Agent` header
//! - `GuestToken`: raw bearer token from `X-Guest-Token`
//! - `AuthenticatedGuest`: the guest behind a valid token
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     State(state): State<AppState>,
//!     guest: AuthenticatedGuest,
//!     client_ip: ClientIp,
//! ) -> Result<Json<Vec<Appointment>>, AppError> {
//!     tracing::info!(
//!         guest_id = %guest.identity.id,
//!         client_ip = %client_ip.0,
//!         "Listing appointments"
//!     );
//!     Ok(Json(state.booking.my_appointments(guest.booking_identity(), filter).await))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use service_portal_auth::GuestIdentity;
use service_portal_scheduling::IdentityId;
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

/// Header carrying the guest bearer token.
pub const GUEST_TOKEN_HEADER: &str = "X-Guest-Token";

/// Correlation ID for request tracing.
///
/// Uses the id stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Loopback
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_client_ip(&parts.headers)))
    }
}

fn extract_client_ip(headers: &HeaderMap) -> IpAddr {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// User-Agent header, or "Unknown".
#[derive(Debug, Clone)]
pub struct UserAgent(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        Ok(Self(user_agent))
    }
}

/// Raw guest token, empty when the header is missing.
#[derive(Clone)]
pub struct GuestToken(pub String);

impl std::fmt::Debug for GuestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GuestToken").field(&"<redacted>").finish()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for GuestToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(guest_token(&parts.headers)))
    }
}

fn guest_token(headers: &HeaderMap) -> String {
    headers
        .get(GUEST_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// The guest a request acts for.
///
/// Resolved from the token on every request; nothing from the body is
/// trusted for identity.
#[derive(Debug, Clone)]
pub struct AuthenticatedGuest {
    /// Guest behind the token
    pub identity: GuestIdentity,
}

impl AuthenticatedGuest {
    /// The same guest as a booking identity.
    #[must_use]
    pub const fn booking_identity(&self) -> IdentityId {
        IdentityId::from_uuid(self.identity.id.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedGuest
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = guest_token(&parts.headers);
        let app = AppState::from_ref(state);
        let identity = app.guests.validate_token(&token).await?;
        tracing::Span::current().record("guest_id", tracing::field::display(identity.id));
        Ok(Self { identity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, header};

    fn request_parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = request_parts(&[(CORRELATION_ID_HEADER, uuid.to_string().as_str())]);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let other = Uuid::new_v4().to_string();
        let mut parts = request_parts(&[(CORRELATION_ID_HEADER, other.as_str())]);
        parts.extensions.insert(stored);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let mut parts = request_parts(&[]);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn test_client_ip_from_x_forwarded_for() {
        let mut parts = request_parts(&[("X-Forwarded-For", "203.0.113.1, 198.51.100.1")]);
        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "203.0.113.1");
    }

    #[tokio::test]
    async fn test_client_ip_from_x_real_ip() {
        let mut parts = request_parts(&[("X-Real-IP", "198.51.100.42")]);
        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "198.51.100.42");
    }

    #[tokio::test]
    async fn test_client_ip_garbage_falls_back() {
        let mut parts = request_parts(&[("X-Forwarded-For", "not-an-ip")]);
        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_user_agent_fallback() {
        let mut parts = request_parts(&[]);
        let user_agent = UserAgent::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user_agent.0, "Unknown");

        let mut parts = request_parts(&[(header::USER_AGENT.as_str(), "Mozilla/5.0 (Test)")]);
        let user_agent = UserAgent::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user_agent.0, "Mozilla/5.0 (Test)");
    }

    #[tokio::test]
    async fn test_guest_token_trimmed_and_redacted() {
        let mut parts = request_parts(&[(GUEST_TOKEN_HEADER, " abc123 ")]);
        let token = GuestToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token.0, "abc123");
        assert!(!format!("{token:?}").contains("abc123"));
    }

    #[tokio::test]
    async fn test_guest_token_missing_is_empty() {
        let mut parts = request_parts(&[]);
        let token = GuestToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(token.0.is_empty());
    }
}
