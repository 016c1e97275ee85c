//! Bookable calendar resources.

use crate::error::{BookingError, Result};
use crate::types::{MeetingProfile, PlanId, ResourceId};
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A person, room or service that can be booked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarResource {
    /// Resource identifier
    pub id: ResourceId,
    /// Display name
    pub name: String,
    /// Timezone every wall-clock time of this resource is interpreted in
    pub timezone: Tz,
    /// Length of each bookable slot
    pub slot_duration_minutes: u32,
    /// How long an unconfirmed draft holds capacity
    #[serde(default)]
    pub draft_expiration_minutes: u32,
    /// Availability plan
    pub plan_id: PlanId,
    /// Online meeting settings, if appointments get a meeting link
    #[serde(default)]
    pub meeting_profile: Option<MeetingProfile>,
    /// Inactive resources reject slot queries and bookings
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl CalendarResource {
    /// Check resource settings.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for a zero slot duration.
    pub fn validate(&self) -> Result<()> {
        if self.slot_duration_minutes == 0 {
            return Err(BookingError::Validation(format!(
                "resource '{}': slot duration must be positive",
                self.name
            )));
        }
        Ok(())
    }

    /// Slot length as a duration.
    #[must_use]
    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_duration_minutes))
    }

    /// Draft hold time as a duration.
    #[must_use]
    pub fn draft_expiration(&self) -> Duration {
        Duration::minutes(i64::from(self.draft_expiration_minutes))
    }

    /// Fail with [`BookingError::ResourceInactive`] unless the resource is active.
    ///
    /// # Errors
    ///
    /// See above.
    pub const fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(BookingError::ResourceInactive(self.id))
        }
    }
}
