//! One-time code routes.

use super::enforce_limit;
use crate::error::AppError;
use crate::extractors::{ClientIp, UserAgent};
use crate::middleware::reject_honeypot;
use crate::state::AppState;
use axum::{Json, extract::State};
use serde::Deserialize;
use service_portal_auth::{GuestSession, OtpChannel, OtpDelivery, PublicOtpSettings};

/// Request a sign-in code.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestOtpRequest {
    /// Document number of a registered guest
    pub document: String,
    /// Delivery channel; the configured default when absent
    #[serde(default)]
    pub channel: Option<OtpChannel>,
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Resend the pending code.
#[derive(Debug, Clone, Deserialize)]
pub struct ResendOtpRequest {
    /// Document the code was requested for
    pub document: String,
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Verify a code.
#[derive(Clone, Deserialize)]
pub struct VerifyOtpRequest {
    /// Document the code was requested for
    pub document: String,
    /// The code as typed
    pub code: String,
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

impl std::fmt::Debug for VerifyOtpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyOtpRequest")
            .field("document", &self.document)
            .field("code", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Send a sign-in code to the phone on file.
///
/// # Endpoint
///
/// ```text
/// POST /api/otp/request
///
/// { "document": "10203040", "channel": "whatsapp" }
/// ```
///
/// # Response
///
/// ```json
/// { "masked_phone": "+57***********67", "channel": "whatsapp", "expiry_minutes": 5 }
/// ```
pub async fn request_otp(
    State(state): State<AppState>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<RequestOtpRequest>,
) -> Result<Json<OtpDelivery>, AppError> {
    reject_honeypot(request.honeypot.as_deref(), "otp.request", &client_ip, &user_agent)?;
    enforce_limit(&state, "otp_request", &client_ip, state.limits.otp_request).await?;

    let delivery = state
        .guests
        .request_otp(&request.document, request.channel)
        .await?;
    Ok(Json(delivery))
}

/// Send a new code for the pending request.
///
/// # Endpoint
///
/// ```text
/// POST /api/otp/resend
///
/// { "document": "10203040" }
/// ```
pub async fn resend_otp(
    State(state): State<AppState>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<ResendOtpRequest>,
) -> Result<Json<OtpDelivery>, AppError> {
    reject_honeypot(request.honeypot.as_deref(), "otp.resend", &client_ip, &user_agent)?;
    enforce_limit(&state, "otp_resend", &client_ip, state.limits.otp_request).await?;

    let delivery = state.guests.resend_otp(&request.document).await?;
    Ok(Json(delivery))
}

/// Verify a code and receive a bearer token.
///
/// # Endpoint
///
/// ```text
/// POST /api/otp/verify
///
/// { "document": "10203040", "code": "482913" }
/// ```
///
/// # Response
///
/// ```json
/// { "token": "…", "identity": { "id": "…", "document": "10203040", … } }
/// ```
pub async fn verify_otp(
    State(state): State<AppState>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<GuestSession>, AppError> {
    reject_honeypot(request.honeypot.as_deref(), "otp.verify", &client_ip, &user_agent)?;
    enforce_limit(&state, "otp_verify", &client_ip, state.limits.verify).await?;

    let session = state
        .guests
        .verify_otp(&request.document, &request.code)
        .await?;
    tracing::info!(guest_id = %session.identity.id, "Guest signed in with a code");
    Ok(Json(session))
}

/// Public OTP settings for the sign-in form.
///
/// # Endpoint
///
/// ```text
/// GET /api/otp/settings
/// ```
#[allow(clippy::unused_async)]
pub async fn otp_settings(State(state): State<AppState>) -> Json<PublicOtpSettings> {
    Json(state.guests.otp_settings())
}
