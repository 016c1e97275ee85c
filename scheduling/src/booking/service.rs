//! Request/response facade over the booking store.

use super::actions::{BookingAction, CancelOutcome};
use super::environment::BookingEnvironment;
use super::reducer::BookingReducer;
use super::state::{AppointmentFilter, BookingState};
use crate::appointment::{Appointment, MeetingStatus};
use crate::catalog::Catalog;
use crate::error::{BookingError, Result};
use crate::resource::CalendarResource;
use crate::slots::{self, Slot};
use crate::types::{AppointmentId, BookingRequest, IdentityId, Outcome, ResourceId};
use chrono::NaiveDate;
use serde::Serialize;
use service_portal_runtime::{Store, StoreError};
use std::sync::Arc;
use uuid::Uuid;

/// Store running the booking reducer.
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

/// Slots of one resource for a date range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotListing {
    /// Resource queried
    pub resource_id: ResourceId,
    /// IANA timezone the dates were interpreted in
    pub timezone: String,
    /// Slot length
    pub slot_duration_minutes: u32,
    /// Slots ordered by start
    pub slots: Vec<Slot>,
}

/// Booking engine entry point used by the HTTP layer.
///
/// Each command is sent with a fresh correlation id and the call waits for
/// the matching terminal action.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<BookingStore>,
}

impl BookingService {
    /// Wrap an existing store.
    #[must_use]
    pub const fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }

    /// Hydrate state from `catalog` and the repository, then start a store.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the repository cannot be read.
    pub async fn start(catalog: Catalog, env: BookingEnvironment) -> Result<Self> {
        let stored = env
            .repository
            .load_all()
            .await
            .map_err(|e| BookingError::Storage(e.to_string()))?;
        tracing::info!(
            resources = catalog.resources.len(),
            plans = catalog.plans.len(),
            appointments = stored.len(),
            "Booking engine hydrated"
        );

        let state = BookingState::new(catalog).with_appointments(stored);
        let store = Store::new(state, BookingReducer::new(), env);
        Ok(Self::new(Arc::new(store)))
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<BookingStore> {
        &self.store
    }

    async fn dispatch(&self, command: impl FnOnce(Uuid) -> BookingAction) -> Result<BookingAction> {
        let correlation_id = Uuid::new_v4();
        let timeout = self.store.environment().config.request_timeout;

        let reply = self
            .store
            .send_and_wait_for(
                command(correlation_id),
                |action| action.is_terminal_for(&correlation_id),
                timeout,
            )
            .await
            .map_err(|e| match e {
                StoreError::Timeout => BookingError::Timeout,
                other => BookingError::Unavailable(other.to_string()),
            })?;

        match reply {
            BookingAction::BookingFailed { error, .. } => Err(error),
            other => Ok(other),
        }
    }

    async fn dispatch_for_appointment(
        &self,
        command: impl FnOnce(Uuid) -> BookingAction,
    ) -> Result<Appointment> {
        match self.dispatch(command).await? {
            BookingAction::AppointmentCommitted { appointment, .. } => Ok(appointment),
            other => Err(unexpected(&other)),
        }
    }

    /// Book and confirm a slot in one step.
    ///
    /// # Errors
    ///
    /// - [`BookingError::CapacityExceeded`]: the slot is full
    /// - [`BookingError::InvalidWindow`]: malformed, misaligned or past window
    /// - [`BookingError::ResourceInactive`]: resource disabled
    /// - [`BookingError::NotFound`]: unknown resource
    /// - [`BookingError::Storage`]: write-through failed (booking rolled back)
    pub async fn create_and_confirm(&self, request: BookingRequest) -> Result<Appointment> {
        let result = self
            .dispatch_for_appointment(|correlation_id| BookingAction::CreateAndConfirm {
                correlation_id,
                request,
            })
            .await;
        record_booking_metrics(&result);
        result
    }

    /// Hold a slot as a draft.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_and_confirm`], plus [`BookingError::Validation`]
    /// when the resource does not hold drafts.
    pub async fn hold_slot(&self, request: BookingRequest) -> Result<Appointment> {
        self.dispatch_for_appointment(|correlation_id| BookingAction::HoldSlot {
            correlation_id,
            request,
        })
        .await
    }

    /// Confirm a held draft. Confirming a confirmed appointment returns it unchanged.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidWindow`] for an expired draft, plus the errors
    /// of [`Self::create_and_confirm`] and [`Self::cancel_or_delete`].
    pub async fn confirm_draft(
        &self,
        appointment_id: AppointmentId,
        identity_id: IdentityId,
    ) -> Result<Appointment> {
        let result = self
            .dispatch_for_appointment(|correlation_id| BookingAction::ConfirmDraft {
                correlation_id,
                appointment_id,
                identity_id,
            })
            .await;
        record_booking_metrics(&result);
        result
    }

    /// Delete a draft or cancel a confirmed appointment.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`]: unknown appointment
    /// - [`BookingError::Forbidden`]: caller does not own it
    /// - [`BookingError::InvalidTransition`]: already completed or no-show
    pub async fn cancel_or_delete(
        &self,
        appointment_id: AppointmentId,
        identity_id: IdentityId,
    ) -> Result<CancelOutcome> {
        match self
            .dispatch(|correlation_id| BookingAction::CancelOrDelete {
                correlation_id,
                appointment_id,
                identity_id,
            })
            .await?
        {
            BookingAction::AppointmentCancelled { outcome, .. } => {
                metrics::counter!("booking.cancelled.total").increment(1);
                Ok(outcome)
            },
            other => Err(unexpected(&other)),
        }
    }

    /// Record a completed or no-show outcome.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidTransition`] unless the appointment is confirmed.
    pub async fn mark_outcome(
        &self,
        appointment_id: AppointmentId,
        outcome: Outcome,
    ) -> Result<Appointment> {
        self.dispatch_for_appointment(|correlation_id| BookingAction::MarkOutcome {
            correlation_id,
            appointment_id,
            outcome,
        })
        .await
    }

    /// Delete every expired draft.
    ///
    /// # Errors
    ///
    /// [`BookingError::Timeout`] or [`BookingError::Unavailable`] if the
    /// store does not answer.
    pub async fn reap_expired_drafts(&self) -> Result<Vec<AppointmentId>> {
        match self
            .dispatch(|correlation_id| BookingAction::ReapExpiredDrafts { correlation_id })
            .await?
        {
            BookingAction::DraftsReaped { removed, .. } => {
                metrics::counter!("booking.drafts.reaped.total").increment(removed.len() as u64);
                Ok(removed)
            },
            other => Err(unexpected(&other)),
        }
    }

    /// Slots of a resource for the local dates `[from, to]`.
    ///
    /// Reads a snapshot of the state; a concurrent booking may take a slot
    /// listed as available.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`]: `from > to` or range too wide
    /// - [`BookingError::NotFound`]: unknown resource
    /// - [`BookingError::ResourceInactive`]: resource disabled
    pub async fn list_slots(
        &self,
        resource_id: ResourceId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SlotListing> {
        let env = self.store.environment();
        if from > to {
            return Err(BookingError::Validation(
                "from date must not be after to date".to_string(),
            ));
        }
        let max_days = env.config.max_range_days;
        if (to - from).num_days() >= i64::from(max_days) {
            return Err(BookingError::Validation(format!(
                "date range must not exceed {max_days} days"
            )));
        }

        let now = env.clock.now();
        let (plan, resource, appointments) = self
            .store
            .state(|state| {
                let (resource, plan) = state.resource_with_plan(resource_id)?;
                let appointments: Vec<Appointment> = state
                    .appointments_for(resource_id)
                    .filter(|a| a.holds_capacity(now))
                    .cloned()
                    .collect();
                Ok::<_, BookingError>((plan.clone(), resource.clone(), appointments))
            })
            .await?;
        resource.ensure_active()?;

        let slots = slots::list_slots(&plan, &resource, from, to, &appointments, now);
        Ok(SlotListing {
            resource_id,
            timezone: resource.timezone.name().to_string(),
            slot_duration_minutes: resource.slot_duration_minutes,
            slots,
        })
    }

    /// An identity's appointments, ordered by start.
    pub async fn my_appointments(
        &self,
        identity_id: IdentityId,
        filter: AppointmentFilter,
    ) -> Vec<Appointment> {
        let now = self.store.environment().clock.now();
        self.store
            .state(|state| state.appointments_of(identity_id, &filter, now))
            .await
    }

    /// One appointment by id.
    pub async fn appointment(&self, id: AppointmentId) -> Option<Appointment> {
        self.store
            .state(|state| state.appointments.get(&id).cloned())
            .await
    }

    /// One resource by id.
    pub async fn resource(&self, id: ResourceId) -> Option<CalendarResource> {
        self.store
            .state(|state| state.resources.get(&id).cloned())
            .await
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService").finish_non_exhaustive()
    }
}

fn unexpected(action: &BookingAction) -> BookingError {
    tracing::error!(?action, "Unexpected booking engine reply");
    BookingError::Unavailable("unexpected booking engine reply".to_string())
}

fn record_booking_metrics(result: &Result<Appointment>) {
    match result {
        Ok(appointment) => {
            metrics::counter!("booking.confirmed.total").increment(1);
            if appointment.meeting.status == MeetingStatus::Failed {
                metrics::counter!("booking.meeting.failed.total").increment(1);
            }
        },
        Err(BookingError::CapacityExceeded) => {
            metrics::counter!("booking.capacity_exceeded.total").increment(1);
        },
        Err(_) => {},
    }
}
