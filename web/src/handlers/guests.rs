//! Guest registration, sign-in by document and the guest's own profile.

use super::{HoneypotOnly, enforce_limit};
use crate::error::AppError;
use crate::extractors::{AuthenticatedGuest, ClientIp, UserAgent};
use crate::middleware::reject_honeypot;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use service_portal_auth::{
    ContactUpdate, GuestIdentity, OtpChannel, RegistrationForm, SignInOutcome,
};

/// Registration body: the form fields plus routing extras.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Guest details
    #[serde(flatten)]
    pub form: RegistrationForm,
    /// Channel for the verification code
    #[serde(default)]
    pub channel: Option<OtpChannel>,
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Sign-in by document.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRequest {
    /// Document number
    pub document: String,
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Contact changes.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContactRequest {
    /// Fields to change
    #[serde(flatten)]
    pub update: ContactUpdate,
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Register a guest.
///
/// # Endpoint
///
/// ```text
/// POST /api/guests/register
///
/// { "document": "10203040", "full_name": "Ana Gómez", "phone": "+57 300 123 4567" }
/// ```
///
/// # Response
///
/// `201` with `{"status": "authenticated", "token": …, "identity": …}` when
/// codes are disabled; `202` with `{"status": "requires_otp", "masked_phone": …}`
/// when a code was sent and must be verified to finish registration.
pub async fn register(
    State(state): State<AppState>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SignInOutcome>), AppError> {
    reject_honeypot(request.honeypot.as_deref(), "guests.register", &client_ip, &user_agent)?;
    enforce_limit(&state, "register", &client_ip, state.limits.register).await?;

    let outcome = state.guests.register(request.form, request.channel).await?;
    let status = match &outcome {
        SignInOutcome::Authenticated(session) => {
            tracing::info!(guest_id = %session.identity.id, "Guest registered");
            StatusCode::CREATED
        },
        SignInOutcome::RequiresOtp(_) => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)))
}

/// Sign in by document number.
///
/// # Endpoint
///
/// ```text
/// POST /api/guests/lookup
///
/// { "document": "10203040" }
/// ```
///
/// Answers like [`register`]: a token straight away, or a code to verify.
pub async fn lookup(
    State(state): State<AppState>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<LookupRequest>,
) -> Result<Json<SignInOutcome>, AppError> {
    reject_honeypot(request.honeypot.as_deref(), "guests.lookup", &client_ip, &user_agent)?;
    enforce_limit(&state, "lookup", &client_ip, state.limits.lookup).await?;

    let outcome = state.guests.lookup_by_document(&request.document).await?;
    Ok(Json(outcome))
}

/// The signed-in guest.
///
/// # Endpoint
///
/// ```text
/// GET /api/guests/me
/// X-Guest-Token: …
/// ```
#[allow(clippy::unused_async)]
pub async fn me(guest: AuthenticatedGuest) -> Json<GuestIdentity> {
    Json(guest.identity)
}

/// Change contact details of the signed-in guest.
///
/// # Endpoint
///
/// ```text
/// POST /api/guests/me
/// X-Guest-Token: …
///
/// { "email": "ana@example.com" }
/// ```
pub async fn update_contact(
    State(state): State<AppState>,
    guest: AuthenticatedGuest,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<UpdateContactRequest>,
) -> Result<Json<GuestIdentity>, AppError> {
    reject_honeypot(request.honeypot.as_deref(), "guests.update", &client_ip, &user_agent)?;

    let identity = state
        .guests
        .update_contact(guest.identity.id, request.update)
        .await?;
    Ok(Json(identity))
}

/// Invalidate the caller's token.
///
/// # Endpoint
///
/// ```text
/// POST /api/guests/logout
/// X-Guest-Token: …
/// ```
pub async fn logout(
    State(state): State<AppState>,
    guest: AuthenticatedGuest,
    client_ip: ClientIp,
    user_agent: UserAgent,
    body: Option<Json<HoneypotOnly>>,
) -> Result<StatusCode, AppError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    reject_honeypot(body.honeypot.as_deref(), "guests.logout", &client_ip, &user_agent)?;
    enforce_limit(&state, "logout", &client_ip, state.limits.logout).await?;

    state.guests.logout(guest.identity.id).await?;
    tracing::info!(guest_id = %guest.identity.id, "Guest signed out");
    Ok(StatusCode::NO_CONTENT)
}
