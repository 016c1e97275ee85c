//! Booking engine state.

use crate::appointment::{Appointment, AppointmentStatus};
use crate::availability::AvailabilityPlan;
use crate::catalog::Catalog;
use crate::error::{BookingError, Result};
use crate::resource::CalendarResource;
use crate::types::{AppointmentId, IdentityId, PlanId, ResourceId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the booking reducer decides on.
#[derive(Clone, Debug, Default)]
pub struct BookingState {
    /// Resources by id
    pub resources: HashMap<ResourceId, CalendarResource>,
    /// Plans by id
    pub plans: HashMap<PlanId, AvailabilityPlan>,
    /// Appointments by id
    pub appointments: HashMap<AppointmentId, Appointment>,
}

/// Filters for an identity's appointment list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    /// Only this status
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    /// Start date on or after (resource timezone)
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Start date on or before (resource timezone)
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl BookingState {
    /// State for a validated catalog, with no appointments.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            resources: catalog.resources.into_iter().map(|r| (r.id, r)).collect(),
            plans: catalog.plans.into_iter().map(|p| (p.id, p)).collect(),
            appointments: HashMap::new(),
        }
    }

    /// Add stored appointments.
    #[must_use]
    pub fn with_appointments(
        mut self,
        appointments: impl IntoIterator<Item = Appointment>,
    ) -> Self {
        self.appointments
            .extend(appointments.into_iter().map(|a| (a.id, a)));
        self
    }

    /// A resource and its plan.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] if either is missing.
    pub fn resource_with_plan(
        &self,
        id: ResourceId,
    ) -> Result<(&CalendarResource, &AvailabilityPlan)> {
        let resource = self
            .resources
            .get(&id)
            .ok_or_else(|| BookingError::resource_not_found(id))?;
        let plan = self
            .plans
            .get(&resource.plan_id)
            .ok_or_else(|| BookingError::NotFound {
                entity: "Plan",
                id: resource.plan_id.to_string(),
            })?;
        Ok((resource, plan))
    }

    /// Appointments booked on `resource_id`, in any status.
    pub fn appointments_for(&self, resource_id: ResourceId) -> impl Iterator<Item = &Appointment> {
        self.appointments
            .values()
            .filter(move |a| a.resource_id == resource_id)
    }

    /// An identity's appointments matching `filter`, ordered by start.
    ///
    /// Expired drafts are left out.
    #[must_use]
    pub fn appointments_of(
        &self,
        identity_id: IdentityId,
        filter: &AppointmentFilter,
        now: DateTime<Utc>,
    ) -> Vec<Appointment> {
        let mut found: Vec<Appointment> = self
            .appointments
            .values()
            .filter(|a| a.identity_id == identity_id && !a.is_expired_draft(now))
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| {
                if filter.from.is_none() && filter.to.is_none() {
                    return true;
                }
                let local = self.resources.get(&a.resource_id).map_or_else(
                    || a.start.date_naive(),
                    |r| a.start.with_timezone(&r.timezone).date_naive(),
                );
                filter.from.is_none_or(|from| local >= from)
                    && filter.to.is_none_or(|to| local <= to)
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start);
        found
    }
}
