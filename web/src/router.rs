//! Router composition.

use crate::handlers::{appointments, guests, health, otp, slots};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// The `/api` routes.
///
/// # Routes
///
/// ## Scheduling
/// - `GET /resources/:id/slots` - Slots of a resource
/// - `POST /appointments` - Book and confirm a slot
/// - `POST /appointments/:id/cancel` - Cancel or delete an appointment
/// - `GET /appointments/mine` - The caller's appointments
///
/// ## One-time codes
/// - `POST /otp/request` - Send a sign-in code
/// - `POST /otp/resend` - Send a new code
/// - `POST /otp/verify` - Verify a code
/// - `GET /otp/settings` - Public code settings
///
/// ## Guests
/// - `POST /guests/register` - Register
/// - `POST /guests/lookup` - Sign in by document
/// - `GET /guests/me` - The signed-in guest
/// - `POST /guests/me` - Change contact details
/// - `POST /guests/logout` - Invalidate the token
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Scheduling
        .route("/resources/:id/slots", get(slots::available_slots))
        .route("/appointments", post(appointments::create_appointment))
        .route("/appointments/mine", get(appointments::my_appointments))
        .route("/appointments/:id/cancel", post(appointments::cancel_appointment))
        // One-time codes
        .route("/otp/request", post(otp::request_otp))
        .route("/otp/resend", post(otp::resend_otp))
        .route("/otp/verify", post(otp::verify_otp))
        .route("/otp/settings", get(otp::otp_settings))
        // Guests
        .route("/guests/register", post(guests::register))
        .route("/guests/lookup", post(guests::lookup))
        .route("/guests/me", get(guests::me).post(guests::update_contact))
        .route("/guests/logout", post(guests::logout))
}

/// The complete application: `/api`, health, readiness and metrics, with
/// correlation ids, request tracing and CORS.
///
/// # Example
///
/// ```rust,ignore
/// let app = service_portal_web::router(AppState::new(booking, guests));
/// axum::serve(listener, app).await?;
/// ```
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-guest-token"),
            HeaderName::from_static("x-correlation-id"),
        ])
        .expose_headers([HeaderName::from_static("x-correlation-id")]);

    Router::new()
        .nest("/api", api_router())
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/metrics", get(health::metrics_export))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
