//! Slot availability.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use service_portal_scheduling::{ResourceId, SlotListing};

/// Inclusive local date range.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    /// First date
    pub from: NaiveDate,
    /// Last date
    pub to: NaiveDate,
}

/// List the slots of a resource.
///
/// # Endpoint
///
/// ```text
/// GET /api/resources/{id}/slots?from=2025-03-03&to=2025-03-07
/// ```
///
/// # Response
///
/// ```json
/// {
///   "resource_id": "…",
///   "timezone": "America/Bogota",
///   "slot_duration_minutes": 30,
///   "slots": [
///     { "start": "2025-03-03T14:00:00Z", "end": "2025-03-03T14:30:00Z",
///       "capacity": 1, "capacity_remaining": 1, "is_available": true }
///   ]
/// }
/// ```
pub async fn available_slots(
    State(state): State<AppState>,
    Path(resource_id): Path<ResourceId>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotListing>, AppError> {
    let listing = state
        .booking
        .list_slots(resource_id, query.from, query.to)
        .await?;
    tracing::debug!(%resource_id, slots = listing.slots.len(), "Slots listed");
    Ok(Json(listing))
}
