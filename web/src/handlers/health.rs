//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use service_portal_runtime::{HealthReport, HealthStatus};

/// Liveness: the process answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness: both stores accept commands.
///
/// # Status Codes
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: a store is shutting down
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "checks": [
///     { "component": "booking", "status": "healthy", "metadata": [["pending_effects", "0"]] },
///     { "component": "guests", "status": "healthy", "metadata": [["pending_effects", "0"]] }
///   ],
///   "timestamp": "2025-03-03T14:00:00Z"
/// }
/// ```
#[allow(clippy::unused_async)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthReport::new(vec![
        state.booking.store().health("booking"),
        state.guests.store().health("guests"),
    ]);

    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(report))
}

/// Prometheus text exposition.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
///
/// 404 when no recorder was installed.
#[allow(clippy::unused_async)]
pub async fn metrics_export(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
