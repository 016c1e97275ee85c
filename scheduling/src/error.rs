//! Booking engine errors.

use crate::appointment::AppointmentStatus;
use crate::types::ResourceId;
use thiserror::Error;

/// Errors returned by the booking engine.
///
/// Cloneable because rejections travel through the store as
/// [`BookingAction::BookingFailed`](crate::booking::BookingAction::BookingFailed).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Malformed input (bad range, bad plan, unknown filter)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested window is not a bookable slot
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// The slot has no remaining capacity
    #[error("No capacity remaining for the requested slot")]
    CapacityExceeded,

    /// The resource does not accept bookings
    #[error("Resource {0} is not accepting bookings")]
    ResourceInactive(ResourceId),

    /// The caller does not own the appointment
    #[error("Appointment belongs to another identity")]
    Forbidden,

    /// Unknown resource or appointment
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity
        entity: &'static str,
        /// Requested id
        id: String,
    },

    /// Status transition not allowed
    #[error("Cannot {action} an appointment in status {status}")]
    InvalidTransition {
        /// Attempted operation
        action: &'static str,
        /// Current status
        status: AppointmentStatus,
    },

    /// The appointment repository rejected a write
    #[error("Storage error: {0}")]
    Storage(String),

    /// The engine did not answer in time
    #[error("Timed out waiting for the booking engine")]
    Timeout,

    /// The engine is shutting down
    #[error("Booking engine unavailable: {0}")]
    Unavailable(String),
}

impl BookingError {
    /// Create a not-found error for a resource.
    #[must_use]
    pub fn resource_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Resource",
            id: id.to_string(),
        }
    }

    /// Create a not-found error for an appointment.
    #[must_use]
    pub fn appointment_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Appointment",
            id: id.to_string(),
        }
    }

    /// Whether the error was caused by the caller rather than the system.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::Storage(_) | Self::Timeout | Self::Unavailable(_)
        )
    }
}

/// Result alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
