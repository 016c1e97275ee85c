//! Identifiers and small value objects shared across the scheduling crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a calendar resource (a bookable person, room or service)
    ResourceId
);

uuid_id!(
    /// Unique identifier for an availability plan
    PlanId
);

uuid_id!(
    /// Unique identifier for an appointment
    AppointmentId
);

uuid_id!(
    /// Identity that owns appointments.
    ///
    /// The scheduling crate never looks inside an identity; the web layer maps
    /// an authenticated guest onto this id.
    IdentityId
);

// ============================================================================
// Value objects
// ============================================================================

/// How a resource creates online meeting links for confirmed appointments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingProfile {
    /// Provider-side profile identifier
    pub id: String,
    /// Provider name, e.g. `"zoom"` or `"jitsi"`
    pub provider: String,
    /// Host account the meeting is created under
    #[serde(default)]
    pub host_email: Option<String>,
    /// Meeting title prefix
    #[serde(default)]
    pub topic: Option<String>,
}

/// A booking request for one slot window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Resource to book
    pub resource_id: ResourceId,
    /// Owner of the resulting appointment
    pub identity_id: IdentityId,
    /// Window start (must match a generated slot)
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
    /// Free-text context supplied by the guest
    #[serde(default)]
    pub context: Option<String>,
}

/// Outcome recorded when a confirmed appointment is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The guest attended
    Completed,
    /// The guest did not show up
    NoShow,
}
