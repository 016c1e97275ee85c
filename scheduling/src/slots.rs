//! Slot generation.
//!
//! Carves each weekly window into back-to-back slots of the resource's slot
//! duration (a trailing partial slot is dropped), maps them to UTC in the
//! resource's timezone, and counts remaining capacity against the
//! appointments that currently hold it.
//!
//! DST: a local start or end that does not exist (spring-forward gap) skips
//! the slot; an ambiguous local time (fall-back overlap) resolves to the
//! earlier instant.

use crate::appointment::Appointment;
use crate::availability::AvailabilityPlan;
use crate::resource::CalendarResource;
use crate::types::AppointmentId;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A concrete window carved from a weekly window, before capacity accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateWindow {
    /// Start instant
    pub start: DateTime<Utc>,
    /// End instant
    pub end: DateTime<Utc>,
    /// Capacity of the weekly window it came from
    pub capacity: u32,
}

/// A bookable slot with its live capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Start instant
    pub start: DateTime<Utc>,
    /// End instant
    pub end: DateTime<Utc>,
    /// Total capacity
    pub capacity: u32,
    /// Capacity left after active appointments
    pub capacity_remaining: u32,
    /// `capacity_remaining > 0`
    pub is_available: bool,
}

/// All candidate windows for one local date.
#[must_use]
pub fn candidate_windows(
    plan: &AvailabilityPlan,
    resource: &CalendarResource,
    date: NaiveDate,
) -> Vec<CandidateWindow> {
    let duration = resource.slot_duration();
    if duration <= chrono::Duration::zero() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for window in plan.windows_on(date.weekday()) {
        let window_end = date.and_time(window.end_time);
        let mut cursor = date.and_time(window.start_time);

        while cursor + duration <= window_end {
            let next = cursor + duration;
            if let (Some(start), Some(end)) = (to_utc(resource, cursor), to_utc(resource, next)) {
                if start < end {
                    out.push(CandidateWindow {
                        start,
                        end,
                        capacity: window.capacity,
                    });
                }
            }
            cursor = next;
        }
    }
    out
}

fn to_utc(resource: &CalendarResource, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    resource
        .timezone
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Find the candidate window exactly matching `[start, end)`.
#[must_use]
pub fn find_window(
    plan: &AvailabilityPlan,
    resource: &CalendarResource,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<CandidateWindow> {
    let local_date = start.with_timezone(&resource.timezone).date_naive();
    candidate_windows(plan, resource, local_date)
        .into_iter()
        .find(|w| w.start == start && w.end == end)
}

/// Capacity left in `window` given the appointments of the same resource.
///
/// `exclude` skips one appointment, used when confirming a draft that
/// already counts against the window.
pub fn remaining_capacity<'a>(
    window: &CandidateWindow,
    appointments: impl IntoIterator<Item = &'a Appointment>,
    now: DateTime<Utc>,
    exclude: Option<AppointmentId>,
) -> u32 {
    let taken = appointments
        .into_iter()
        .filter(|a| Some(a.id) != exclude)
        .filter(|a| a.holds_capacity(now) && a.overlaps(window.start, window.end))
        .count();
    let taken = u32::try_from(taken).unwrap_or(u32::MAX);
    window.capacity.saturating_sub(taken)
}

/// List slots for the local date range `[from, to]` (inclusive).
///
/// `appointments` must belong to `resource`. Slots that already started at
/// `now` are omitted. Slots are ordered by start.
#[must_use]
pub fn list_slots(
    plan: &AvailabilityPlan,
    resource: &CalendarResource,
    from: NaiveDate,
    to: NaiveDate,
    appointments: &[Appointment],
    now: DateTime<Utc>,
) -> Vec<Slot> {
    let mut slots: Vec<Slot> = from
        .iter_days()
        .take_while(|day| *day <= to)
        .flat_map(|day| candidate_windows(plan, resource, day))
        .filter(|window| window.start > now)
        .map(|window| {
            let remaining = remaining_capacity(&window, appointments, now, None);
            Slot {
                start: window.start,
                end: window.end,
                capacity: window.capacity,
                capacity_remaining: remaining,
                is_available: remaining > 0,
            }
        })
        .collect();
    slots.sort_by_key(|s| s.start);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::{AppointmentStatus, MeetingInfo};
    use crate::availability::WeeklySlot;
    use crate::types::{IdentityId, PlanId, ResourceId};
    use chrono::{Duration, NaiveTime, Weekday};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn fixture(
        tz: Tz,
        slots: Vec<WeeklySlot>,
        minutes: u32,
    ) -> (AvailabilityPlan, CalendarResource) {
        let plan = AvailabilityPlan {
            id: PlanId::new(),
            name: "Plan".into(),
            timezone: tz,
            slots,
        };
        let resource = CalendarResource {
            id: ResourceId::new(),
            name: "Advisor".into(),
            timezone: tz,
            slot_duration_minutes: minutes,
            draft_expiration_minutes: 15,
            plan_id: plan.id,
            meeting_profile: None,
            active: true,
        };
        (plan, resource)
    }

    fn booking(
        resource: &CalendarResource,
        start: DateTime<Utc>,
        minutes: i64,
        status: AppointmentStatus,
    ) -> Appointment {
        Appointment {
            id: AppointmentId::new(),
            resource_id: resource.id,
            identity_id: IdentityId::new(),
            start,
            end: start + Duration::minutes(minutes),
            status,
            draft_expires_at: None,
            meeting: MeetingInfo::not_required(),
            context: None,
            created_at: start,
            updated_at: start,
        }
    }

    // 2025-03-03 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn test_monday_morning_has_six_half_hour_slots() {
        let (plan, resource) = fixture(
            chrono_tz::UTC,
            vec![WeeklySlot::new(Weekday::Mon, time(9, 0), time(12, 0), 1)],
            30,
        );
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let slots = list_slots(&plan, &resource, monday(), monday(), &[], now);
        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|s| s.is_available && s.capacity_remaining == 1));
        assert_eq!(slots[0].start, Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap());
        assert_eq!(slots[5].end, Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_confirmed_booking_consumes_its_slot_only() {
        let (plan, resource) = fixture(
            chrono_tz::UTC,
            vec![WeeklySlot::new(Weekday::Mon, time(9, 0), time(12, 0), 1)],
            30,
        );
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let nine = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        let appts = vec![booking(&resource, nine, 30, AppointmentStatus::Confirmed)];

        let slots = list_slots(&plan, &resource, monday(), monday(), &appts, now);
        assert_eq!(slots.len(), 6);
        assert_eq!(slots.iter().filter(|s| s.is_available).count(), 5);
        assert_eq!(slots[0].capacity_remaining, 0);
        assert!(!slots[0].is_available);
    }

    #[test]
    fn test_cancelled_booking_does_not_consume() {
        let (plan, resource) = fixture(
            chrono_tz::UTC,
            vec![WeeklySlot::new(Weekday::Mon, time(9, 0), time(10, 0), 1)],
            30,
        );
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let nine = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        let appts = vec![booking(&resource, nine, 30, AppointmentStatus::Cancelled)];
        let slots = list_slots(&plan, &resource, monday(), monday(), &appts, now);
        assert!(slots.iter().all(|s| s.is_available));
    }

    #[test]
    fn test_trailing_partial_slot_dropped() {
        let (plan, resource) = fixture(
            chrono_tz::UTC,
            vec![WeeklySlot::new(Weekday::Mon, time(9, 0), time(10, 10), 2)],
            20,
        );
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let slots = list_slots(&plan, &resource, monday(), monday(), &[], now);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].end, Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_local_times_follow_resource_timezone() {
        let (plan, resource) = fixture(
            chrono_tz::America::Bogota,
            vec![WeeklySlot::new(Weekday::Mon, time(9, 0), time(10, 0), 1)],
            60,
        );
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let slots = list_slots(&plan, &resource, monday(), monday(), &[], now);
        assert_eq!(slots.len(), 1);
        // Bogota is UTC-5 year round
        assert_eq!(slots[0].start, Utc.with_ymd_and_hms(2025, 3, 3, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_spring_forward_gap_skips_slots() {
        // 2025-03-09 02:00 does not exist in New York
        let (plan, resource) = fixture(
            chrono_tz::America::New_York,
            vec![WeeklySlot::new(Weekday::Sun, time(1, 0), time(4, 0), 1)],
            60,
        );
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let windows = candidate_windows(&plan, &resource, day);
        // 01:00-02:00 has a nonexistent end, 02:00-03:00 a nonexistent start
        assert_eq!(windows.len(), 1);
        assert_eq!(
            windows[0].start,
            Utc.with_ymd_and_hms(2025, 3, 9, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_fall_back_ambiguity_uses_earlier_instant() {
        // 2025-11-02 01:00-02:00 happens twice in New York
        let (plan, resource) = fixture(
            chrono_tz::America::New_York,
            vec![WeeklySlot::new(Weekday::Sun, time(1, 0), time(1, 30), 1)],
            30,
        );
        let day = NaiveDate::from_ymd_opt(2025, 11, 2).unwrap();
        let windows = candidate_windows(&plan, &resource, day);
        assert_eq!(windows.len(), 1);
        // earlier instant is EDT (UTC-4)
        assert_eq!(
            windows[0].start,
            Utc.with_ymd_and_hms(2025, 11, 2, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_started_slots_omitted() {
        let (plan, resource) = fixture(
            chrono_tz::UTC,
            vec![WeeklySlot::new(Weekday::Mon, time(9, 0), time(12, 0), 1)],
            30,
        );
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();
        let slots = list_slots(&plan, &resource, monday(), monday(), &[], now);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].start, Utc.with_ymd_and_hms(2025, 3, 3, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_find_window_requires_exact_match() {
        let (plan, resource) = fixture(
            chrono_tz::UTC,
            vec![WeeklySlot::new(Weekday::Mon, time(9, 0), time(12, 0), 1)],
            30,
        );
        let nine = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        assert!(find_window(&plan, &resource, nine, nine + Duration::minutes(30)).is_some());
        let shifted = nine + Duration::minutes(10);
        assert!(find_window(&plan, &resource, shifted, shifted + Duration::minutes(30)).is_none());
        assert!(find_window(&plan, &resource, nine, nine + Duration::minutes(60)).is_none());
    }

    #[test]
    fn test_remaining_capacity_excludes_self() {
        let (_, resource) = fixture(chrono_tz::UTC, vec![], 30);
        let nine = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        let held = booking(&resource, nine, 30, AppointmentStatus::Confirmed);
        let window = CandidateWindow {
            start: nine,
            end: nine + Duration::minutes(30),
            capacity: 1,
        };
        let appts = [held.clone()];
        assert_eq!(remaining_capacity(&window, &appts, nine, None), 0);
        assert_eq!(remaining_capacity(&window, &appts, nine, Some(held.id)), 1);
    }

    proptest! {
        #[test]
        fn prop_slots_are_ordered_and_sized(
            start_hour in 0u32..20,
            span_hours in 1u32..4,
            minutes in prop::sample::select(vec![10u32, 15, 20, 30, 45, 60]),
            capacity in 1u32..5,
        ) {
            let end_hour = (start_hour + span_hours).min(23);
            let (plan, resource) = fixture(
                chrono_tz::UTC,
                vec![WeeklySlot::new(
                    Weekday::Mon,
                    time(start_hour, 0),
                    time(end_hour, 0),
                    capacity,
                )],
                minutes,
            );
            let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
            let slots = list_slots(&plan, &resource, monday(), monday(), &[], now);

            let expected = (end_hour - start_hour) * 60 / minutes;
            prop_assert_eq!(slots.len(), expected as usize);
            for pair in slots.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start);
            }
            for slot in &slots {
                prop_assert_eq!(slot.end - slot.start, Duration::minutes(i64::from(minutes)));
                prop_assert_eq!(slot.capacity_remaining, capacity);
            }
        }

        #[test]
        fn prop_remaining_never_exceeds_capacity(
            capacity in 1u32..4,
            bookings in 0usize..8,
        ) {
            let (_, resource) = fixture(chrono_tz::UTC, vec![], 30);
            let nine = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
            let window = CandidateWindow {
                start: nine,
                end: nine + Duration::minutes(30),
                capacity,
            };
            let appts: Vec<_> = (0..bookings)
                .map(|_| booking(&resource, nine, 30, AppointmentStatus::Confirmed))
                .collect();
            let remaining = remaining_capacity(&window, &appts, nine, None);
            prop_assert!(remaining <= capacity);
            prop_assert_eq!(remaining, capacity.saturating_sub(bookings as u32));
        }
    }
}
