//! Booking, cancellation and the guest's own appointments.
//!
//! The booking identity always comes from the token.

use super::HoneypotOnly;
use crate::error::AppError;
use crate::extractors::{AuthenticatedGuest, ClientIp, CorrelationId, UserAgent};
use crate::middleware::reject_honeypot;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use service_portal_scheduling::{
    Appointment, AppointmentFilter, AppointmentId, BookingRequest, CancelOutcome, ResourceId,
};

/// Request to book a slot.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    /// Resource to book
    pub resource_id: ResourceId,
    /// Slot start
    pub start: DateTime<Utc>,
    /// Slot end
    pub end: DateTime<Utc>,
    /// Free-text reason for the visit
    #[serde(default)]
    pub context: Option<String>,
    /// Decoy field; must be empty
    #[serde(default)]
    pub honeypot: Option<String>,
}

/// Book and confirm a slot.
///
/// # Endpoint
///
/// ```text
/// POST /api/appointments
/// X-Guest-Token: …
///
/// { "resource_id": "…", "start": "2025-03-03T09:00:00Z", "end": "2025-03-03T09:30:00Z" }
/// ```
///
/// Returns `201` with the confirmed appointment, or `409 CAPACITY_EXCEEDED`
/// when the slot filled up meanwhile.
pub async fn create_appointment(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    guest: AuthenticatedGuest,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    reject_honeypot(request.honeypot.as_deref(), "appointments.create", &client_ip, &user_agent)?;

    let appointment = state
        .booking
        .create_and_confirm(BookingRequest {
            resource_id: request.resource_id,
            identity_id: guest.booking_identity(),
            start: request.start,
            end: request.end,
            context: request.context,
        })
        .await?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        appointment_id = %appointment.id,
        resource_id = %appointment.resource_id,
        start = %appointment.start,
        "Appointment booked"
    );
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Cancel a confirmed appointment or delete a draft.
///
/// # Endpoint
///
/// ```text
/// POST /api/appointments/{id}/cancel
/// X-Guest-Token: …
/// ```
///
/// The body is optional; when present only `honeypot` is read.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    guest: AuthenticatedGuest,
    Path(appointment_id): Path<AppointmentId>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    body: Option<Json<HoneypotOnly>>,
) -> Result<Json<CancelOutcome>, AppError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    reject_honeypot(body.honeypot.as_deref(), "appointments.cancel", &client_ip, &user_agent)?;

    let outcome = state
        .booking
        .cancel_or_delete(appointment_id, guest.booking_identity())
        .await?;
    tracing::info!(%appointment_id, action = ?outcome.action, "Appointment cancelled");
    Ok(Json(outcome))
}

/// The caller's appointments.
///
/// # Endpoint
///
/// ```text
/// GET /api/appointments/mine?status=confirmed&from=2025-03-01&to=2025-03-31
/// X-Guest-Token: …
/// ```
pub async fn my_appointments(
    State(state): State<AppState>,
    guest: AuthenticatedGuest,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(AppError::validation("from date must not be after to date"));
        }
    }
    let appointments = state
        .booking
        .my_appointments(guest.booking_identity(), filter)
        .await;
    Ok(Json(appointments))
}
