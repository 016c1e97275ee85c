//! Appointments and their lifecycle.
//!
//! ```text
//!  Draft ──confirm──▶ Confirmed ──mark──▶ Completed | NoShow
//!    │                   │
//!    └─cancel/expire─▶ (deleted)   └─cancel─▶ Cancelled
//! ```
//!
//! A draft holds capacity until `draft_expires_at`; a confirmed appointment
//! holds it until cancelled. Cancelled, completed and no-show appointments
//! never count against capacity.

use crate::types::{AppointmentId, IdentityId, ResourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Appointment status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Held but not confirmed
    Draft,
    /// Booked
    Confirmed,
    /// Cancelled after confirmation
    Cancelled,
    /// Took place
    Completed,
    /// Guest did not attend
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
        };
        f.write_str(name)
    }
}

/// Meeting link status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    /// Resource has no meeting profile
    NotRequired,
    /// Creation in flight
    Pending,
    /// Link created
    Created,
    /// Provider failed; see `error`
    Failed,
}

/// Online meeting details attached to an appointment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingInfo {
    /// Current status
    pub status: MeetingStatus,
    /// Join URL
    pub url: Option<String>,
    /// Provider-side meeting id
    pub external_id: Option<String>,
    /// Provider error message
    pub error: Option<String>,
}

impl MeetingInfo {
    /// No meeting for this appointment.
    #[must_use]
    pub const fn not_required() -> Self {
        Self {
            status: MeetingStatus::NotRequired,
            url: None,
            external_id: None,
            error: None,
        }
    }

    /// Meeting creation requested.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            status: MeetingStatus::Pending,
            url: None,
            external_id: None,
            error: None,
        }
    }
}

/// A booking of one slot on one resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment identifier
    pub id: AppointmentId,
    /// Booked resource
    pub resource_id: ResourceId,
    /// Owner
    pub identity_id: IdentityId,
    /// Slot start
    pub start: DateTime<Utc>,
    /// Slot end
    pub end: DateTime<Utc>,
    /// Lifecycle status
    pub status: AppointmentStatus,
    /// When a draft stops holding capacity
    pub draft_expires_at: Option<DateTime<Utc>>,
    /// Meeting link details
    pub meeting: MeetingInfo,
    /// Free-text context from the guest
    pub context: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this appointment consumes capacity at `now`.
    #[must_use]
    pub fn holds_capacity(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            AppointmentStatus::Confirmed => true,
            AppointmentStatus::Draft => self.draft_expires_at.is_some_and(|at| now < at),
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => false,
        }
    }

    /// Whether this is a draft whose hold has lapsed.
    #[must_use]
    pub fn is_expired_draft(&self, now: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Draft
            && self.draft_expires_at.is_none_or(|at| now >= at)
    }

    /// Half-open interval overlap with `[start, end)`.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}
