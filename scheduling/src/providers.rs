//! Provider traits the booking engine depends on.
//!
//! Methods return boxed futures so the traits stay object safe and can be
//! held as `Arc<dyn ...>` in [`BookingEnvironment`](crate::booking::BookingEnvironment).

use crate::appointment::Appointment;
use crate::types::{AppointmentId, MeetingProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by provider methods.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Repository write/read failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Backend unreachable or failed
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// Write conflicts with stored data
    #[error("Repository conflict: {0}")]
    Conflict(String),
}

/// Durable appointment storage.
///
/// The booking state is authoritative while the process runs; the
/// repository is written through after every accepted change and read once
/// at startup to hydrate the state.
pub trait AppointmentRepository: Send + Sync {
    /// Store a new appointment.
    fn insert(&self, appointment: Appointment) -> ProviderFuture<'_, Result<(), RepositoryError>>;

    /// Replace an existing appointment.
    fn update(&self, appointment: Appointment) -> ProviderFuture<'_, Result<(), RepositoryError>>;

    /// Hard-delete an appointment.
    fn delete(&self, id: AppointmentId) -> ProviderFuture<'_, Result<(), RepositoryError>>;

    /// Load every stored appointment.
    fn load_all(&self) -> ProviderFuture<'_, Result<Vec<Appointment>, RepositoryError>>;
}

/// Meeting provider failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeetingError {
    /// No provider configured
    #[error("Meeting provider is not configured")]
    NotConfigured,

    /// Provider unreachable
    #[error("Meeting provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered with an error
    #[error("Meeting provider rejected the request: {0}")]
    Rejected(String),

    /// Provider did not answer in time
    #[error("Meeting provider timed out")]
    Timeout,
}

/// Request to create a meeting for a confirmed appointment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRequest {
    /// Appointment the meeting is for
    pub appointment_id: AppointmentId,
    /// Resource's meeting profile
    pub profile: MeetingProfile,
    /// Meeting title
    pub topic: String,
    /// Start instant
    pub start: DateTime<Utc>,
    /// End instant
    pub end: DateTime<Utc>,
}

/// A created meeting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingLink {
    /// Join URL
    pub url: String,
    /// Provider-side id
    pub id: String,
}

/// Creates online meeting links.
pub trait MeetingProvider: Send + Sync {
    /// Create a meeting.
    fn create_meeting(
        &self,
        request: MeetingRequest,
    ) -> ProviderFuture<'_, Result<MeetingLink, MeetingError>>;
}
