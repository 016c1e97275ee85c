//! Weekly availability plans.
//!
//! A plan is a set of recurring weekly windows, each with a capacity: the
//! number of concurrent appointments allowed in any single slot carved from
//! that window. Times are wall-clock times in the owning resource's timezone.

use crate::error::{BookingError, Result};
use crate::types::PlanId;
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One recurring weekly window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySlot {
    /// Day of week
    pub weekday: Weekday,
    /// Local start time (inclusive)
    pub start_time: NaiveTime,
    /// Local end time (exclusive)
    pub end_time: NaiveTime,
    /// Concurrent appointments allowed per generated slot
    pub capacity: u32,
}

impl WeeklySlot {
    /// Create a weekly window.
    #[must_use]
    pub const fn new(
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
        capacity: u32,
    ) -> Self {
        Self {
            weekday,
            start_time,
            end_time,
            capacity,
        }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.weekday == other.weekday
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

/// A named set of weekly windows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityPlan {
    /// Plan identifier
    pub id: PlanId,
    /// Display name
    pub name: String,
    /// Timezone the plan was authored in
    pub timezone: Tz,
    /// Weekly windows
    pub slots: Vec<WeeklySlot>,
}

impl AvailabilityPlan {
    /// Check the plan's windows.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if a window is empty or inverted,
    /// has zero capacity, or overlaps another window on the same weekday.
    pub fn validate(&self) -> Result<()> {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.start_time >= slot.end_time {
                return Err(BookingError::Validation(format!(
                    "plan '{}': {} window starts at {} but ends at {}",
                    self.name, slot.weekday, slot.start_time, slot.end_time
                )));
            }
            if slot.capacity == 0 {
                return Err(BookingError::Validation(format!(
                    "plan '{}': {} window at {} has zero capacity",
                    self.name, slot.weekday, slot.start_time
                )));
            }
            if let Some(other) = self.slots[index + 1..].iter().find(|o| slot.overlaps(o)) {
                return Err(BookingError::Validation(format!(
                    "plan '{}': {} windows {}-{} and {}-{} overlap",
                    self.name,
                    slot.weekday,
                    slot.start_time,
                    slot.end_time,
                    other.start_time,
                    other.end_time
                )));
            }
        }
        Ok(())
    }

    /// Windows that recur on `weekday`, ordered by start time.
    #[must_use]
    pub fn windows_on(&self, weekday: Weekday) -> Vec<&WeeklySlot> {
        let mut windows: Vec<_> = self.slots.iter().filter(|s| s.weekday == weekday).collect();
        windows.sort_by_key(|s| s.start_time);
        windows
    }
}
