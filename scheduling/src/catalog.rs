//! Resource catalog: the plans and resources the engine serves.
//!
//! Loaded once at startup from JSON:
//!
//! ```json
//! {
//!   "plans": [{ "id": "...", "name": "Weekdays", "timezone": "America/Bogota",
//!               "slots": [{ "weekday": "Mon", "start_time": "09:00:00",
//!                           "end_time": "12:00:00", "capacity": 1 }] }],
//!   "resources": [{ "id": "...", "name": "Front desk", "timezone": "America/Bogota",
//!                   "slot_duration_minutes": 30, "draft_expiration_minutes": 15,
//!                   "plan_id": "..." }]
//! }
//! ```

use crate::availability::AvailabilityPlan;
use crate::error::{BookingError, Result};
use crate::resource::CalendarResource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Plans and resources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Availability plans
    #[serde(default)]
    pub plans: Vec<AvailabilityPlan>,
    /// Bookable resources
    #[serde(default)]
    pub resources: Vec<CalendarResource>,
}

impl Catalog {
    /// Parse and validate a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for malformed JSON or an invalid catalog.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| BookingError::Validation(format!("invalid catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check every plan and resource, and the links between them.
    ///
    /// A resource must reference an existing plan authored in the same
    /// timezone.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut plan_ids = HashSet::new();
        for plan in &self.plans {
            plan.validate()?;
            if !plan_ids.insert(plan.id) {
                return Err(BookingError::Validation(format!(
                    "duplicate plan id {}",
                    plan.id
                )));
            }
        }

        let mut resource_ids = HashSet::new();
        for resource in &self.resources {
            resource.validate()?;
            if !resource_ids.insert(resource.id) {
                return Err(BookingError::Validation(format!(
                    "duplicate resource id {}",
                    resource.id
                )));
            }
            let plan = self
                .plans
                .iter()
                .find(|p| p.id == resource.plan_id)
                .ok_or_else(|| {
                    BookingError::Validation(format!(
                        "resource '{}' references unknown plan {}",
                        resource.name, resource.plan_id
                    ))
                })?;
            if plan.timezone != resource.timezone {
                return Err(BookingError::Validation(format!(
                    "resource '{}' is in {} but its plan '{}' is in {}",
                    resource.name, resource.timezone, plan.name, plan.timezone
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN_ID: &str = "1b2f0c8e-3d4a-4c55-8e6f-7a8b9c0d1e2f";

    fn catalog_json(resource_tz: &str, plan_id: &str) -> String {
        serde_json::json!({
            "plans": [{
                "id": PLAN_ID,
                "name": "Weekdays",
                "timezone": "America/Bogota",
                "slots": [{
                    "weekday": "Mon",
                    "start_time": "09:00:00",
                    "end_time": "12:00:00",
                    "capacity": 1
                }]
            }],
            "resources": [{
                "id": "7f1c5e0a-9a53-4d59-9f3c-5d7f3b2e8a11",
                "name": "Front desk",
                "timezone": resource_tz,
                "slot_duration_minutes": 30,
                "draft_expiration_minutes": 15,
                "plan_id": plan_id
            }]
        })
        .to_string()
    }

    #[test]
    fn test_valid_catalog_loads() {
        let catalog = Catalog::from_json(&catalog_json("America/Bogota", PLAN_ID)).unwrap();
        assert_eq!(catalog.plans.len(), 1);
        assert_eq!(catalog.resources.len(), 1);
        assert_eq!(catalog.plans[0].slots[0].weekday, chrono::Weekday::Mon);
    }

    #[test]
    fn test_unknown_plan_rejected() {
        let json = catalog_json("America/Bogota", "00000000-0000-4000-8000-000000000000");
        let err = Catalog::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("unknown plan"));
    }

    #[test]
    fn test_timezone_mismatch_rejected() {
        let err = Catalog::from_json(&catalog_json("Europe/Madrid", PLAN_ID)).unwrap_err();
        assert!(err.to_string().contains("Europe/Madrid"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Catalog::from_json("{ not json"),
            Err(BookingError::Validation(_))
        ));
    }
}
