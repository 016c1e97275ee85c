//! Booking reducer.
//!
//! Runs under the store's write lock, so the capacity recount and the insert
//! of a new appointment happen atomically with respect to every other
//! command. Repository writes and meeting calls happen in effects; their
//! results come back as feedback actions.

use super::actions::{BookingAction, CancelAction, CancelOutcome, Rollback};
use super::environment::BookingEnvironment;
use super::state::BookingState;
use crate::appointment::{Appointment, AppointmentStatus, MeetingInfo, MeetingStatus};
use crate::error::BookingError;
use crate::providers::{MeetingError, MeetingLink, MeetingRequest};
use crate::resource::CalendarResource;
use crate::slots::{self, CandidateWindow};
use crate::types::{AppointmentId, BookingRequest, IdentityId, Outcome};
use service_portal_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;
use uuid::Uuid;

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// A repository write to perform after the in-memory change.
enum Write {
    Insert(Appointment),
    Update {
        current: Appointment,
        previous: Appointment,
    },
    Delete {
        previous: Appointment,
    },
}

/// What to do once the write succeeded.
enum Next {
    Emit(BookingAction),
    Meeting(MeetingRequest),
}

/// Booking reducer
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reject(correlation_id: Uuid, error: BookingError) -> Effects {
        tracing::debug!(%correlation_id, %error, "Booking command rejected");
        smallvec![Effect::emit(BookingAction::BookingFailed {
            correlation_id,
            error,
        })]
    }

    /// Checks shared by every command that takes a slot.
    fn validate_window(
        state: &BookingState,
        request: &BookingRequest,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(CalendarResource, CandidateWindow), BookingError> {
        let (resource, plan) = state.resource_with_plan(request.resource_id)?;
        resource.ensure_active()?;

        if request.start >= request.end {
            return Err(BookingError::InvalidWindow(
                "start must be before end".to_string(),
            ));
        }
        if request.end - request.start != resource.slot_duration() {
            return Err(BookingError::InvalidWindow(format!(
                "appointments on this resource last {} minutes",
                resource.slot_duration_minutes
            )));
        }
        if request.start <= now {
            return Err(BookingError::InvalidWindow(
                "start must be in the future".to_string(),
            ));
        }

        let window = slots::find_window(plan, resource, request.start, request.end).ok_or_else(
            || BookingError::InvalidWindow("window is not a slot of this resource".to_string()),
        )?;
        Ok((resource.clone(), window))
    }

    fn take_slot(
        state: &mut BookingState,
        correlation_id: Uuid,
        request: BookingRequest,
        env: &BookingEnvironment,
        as_draft: bool,
    ) -> Effects {
        let now = env.clock.now();
        let (resource, window) = match Self::validate_window(state, &request, now) {
            Ok(found) => found,
            Err(error) => return Self::reject(correlation_id, error),
        };

        if as_draft && resource.draft_expiration_minutes == 0 {
            return Self::reject(
                correlation_id,
                BookingError::Validation(format!(
                    "resource '{}' does not hold drafts",
                    resource.name
                )),
            );
        }

        let remaining =
            slots::remaining_capacity(&window, state.appointments_for(resource.id), now, None);
        if remaining == 0 {
            return Self::reject(correlation_id, BookingError::CapacityExceeded);
        }

        let (status, draft_expires_at, meeting) = if as_draft {
            (
                AppointmentStatus::Draft,
                Some(now + resource.draft_expiration()),
                MeetingInfo::not_required(),
            )
        } else {
            (AppointmentStatus::Confirmed, None, meeting_info_for(&resource))
        };

        let appointment = Appointment {
            id: AppointmentId::new(),
            resource_id: resource.id,
            identity_id: request.identity_id,
            start: request.start,
            end: request.end,
            status,
            draft_expires_at,
            meeting,
            context: request.context,
            created_at: now,
            updated_at: now,
        };
        state
            .appointments
            .insert(appointment.id, appointment.clone());

        tracing::info!(
            %correlation_id,
            appointment_id = %appointment.id,
            resource_id = %resource.id,
            start = %appointment.start,
            status = %appointment.status,
            remaining = remaining - 1,
            "Slot taken"
        );

        let next = match meeting_request(&resource, &appointment) {
            Some(request) if !as_draft => Next::Meeting(request),
            _ => Next::Emit(BookingAction::AppointmentCommitted {
                correlation_id,
                appointment: appointment.clone(),
            }),
        };
        smallvec![write_through(env, correlation_id, Write::Insert(appointment), next)]
    }

    fn confirm_draft(
        state: &mut BookingState,
        correlation_id: Uuid,
        appointment_id: AppointmentId,
        identity_id: IdentityId,
        env: &BookingEnvironment,
    ) -> Effects {
        let now = env.clock.now();
        let previous = match owned_appointment(state, appointment_id, identity_id) {
            Ok(found) => found.clone(),
            Err(error) => return Self::reject(correlation_id, error),
        };

        match previous.status {
            AppointmentStatus::Confirmed => {
                return smallvec![Effect::emit(BookingAction::AppointmentCommitted {
                    correlation_id,
                    appointment: previous,
                })];
            },
            AppointmentStatus::Draft => {},
            status => {
                return Self::reject(
                    correlation_id,
                    BookingError::InvalidTransition {
                        action: "confirm",
                        status,
                    },
                );
            },
        }

        if previous.is_expired_draft(now) {
            return Self::reject(
                correlation_id,
                BookingError::InvalidWindow("draft hold has expired".to_string()),
            );
        }

        let request = BookingRequest {
            resource_id: previous.resource_id,
            identity_id,
            start: previous.start,
            end: previous.end,
            context: previous.context.clone(),
        };
        let (resource, window) = match Self::validate_window(state, &request, now) {
            Ok(found) => found,
            Err(error) => return Self::reject(correlation_id, error),
        };

        let remaining = slots::remaining_capacity(
            &window,
            state.appointments_for(resource.id),
            now,
            Some(appointment_id),
        );
        if remaining == 0 {
            return Self::reject(correlation_id, BookingError::CapacityExceeded);
        }

        let mut current = previous.clone();
        current.status = AppointmentStatus::Confirmed;
        current.draft_expires_at = None;
        current.meeting = meeting_info_for(&resource);
        current.updated_at = now;
        state.appointments.insert(appointment_id, current.clone());

        tracing::info!(%correlation_id, %appointment_id, "Draft confirmed");

        let next = match meeting_request(&resource, &current) {
            Some(request) => Next::Meeting(request),
            None => Next::Emit(BookingAction::AppointmentCommitted {
                correlation_id,
                appointment: current.clone(),
            }),
        };
        smallvec![write_through(
            env,
            correlation_id,
            Write::Update { current, previous },
            next
        )]
    }

    fn cancel_or_delete(
        state: &mut BookingState,
        correlation_id: Uuid,
        appointment_id: AppointmentId,
        identity_id: IdentityId,
        env: &BookingEnvironment,
    ) -> Effects {
        let previous = match owned_appointment(state, appointment_id, identity_id) {
            Ok(found) => found.clone(),
            Err(error) => return Self::reject(correlation_id, error),
        };

        match previous.status {
            AppointmentStatus::Draft => {
                state.appointments.remove(&appointment_id);
                tracing::info!(%correlation_id, %appointment_id, "Draft deleted");
                let outcome = CancelOutcome {
                    appointment_id,
                    action: CancelAction::Deleted,
                    message: "Draft appointment deleted".to_string(),
                };
                smallvec![write_through(
                    env,
                    correlation_id,
                    Write::Delete { previous },
                    Next::Emit(BookingAction::AppointmentCancelled {
                        correlation_id,
                        outcome
                    }),
                )]
            },
            AppointmentStatus::Confirmed => {
                let mut current = previous.clone();
                current.status = AppointmentStatus::Cancelled;
                current.updated_at = env.clock.now();
                state.appointments.insert(appointment_id, current.clone());
                tracing::info!(%correlation_id, %appointment_id, "Appointment cancelled");
                let outcome = CancelOutcome {
                    appointment_id,
                    action: CancelAction::Cancelled,
                    message: "Appointment cancelled".to_string(),
                };
                smallvec![write_through(
                    env,
                    correlation_id,
                    Write::Update { current, previous },
                    Next::Emit(BookingAction::AppointmentCancelled {
                        correlation_id,
                        outcome
                    }),
                )]
            },
            AppointmentStatus::Cancelled => {
                smallvec![Effect::emit(BookingAction::AppointmentCancelled {
                    correlation_id,
                    outcome: CancelOutcome {
                        appointment_id,
                        action: CancelAction::Cancelled,
                        message: "Appointment was already cancelled".to_string(),
                    },
                })]
            },
            status @ (AppointmentStatus::Completed | AppointmentStatus::NoShow) => Self::reject(
                correlation_id,
                BookingError::InvalidTransition {
                    action: "cancel",
                    status,
                },
            ),
        }
    }

    fn mark_outcome(
        state: &mut BookingState,
        correlation_id: Uuid,
        appointment_id: AppointmentId,
        outcome: Outcome,
        env: &BookingEnvironment,
    ) -> Effects {
        let now = env.clock.now();
        let Some(previous) = state.appointments.get(&appointment_id).cloned() else {
            return Self::reject(
                correlation_id,
                BookingError::appointment_not_found(appointment_id),
            );
        };

        if previous.status != AppointmentStatus::Confirmed {
            return Self::reject(
                correlation_id,
                BookingError::InvalidTransition {
                    action: "record the outcome of",
                    status: previous.status,
                },
            );
        }
        if now < previous.start {
            return Self::reject(
                correlation_id,
                BookingError::Validation(
                    "outcome can only be recorded once the appointment has started".to_string(),
                ),
            );
        }

        let mut current = previous.clone();
        current.status = match outcome {
            Outcome::Completed => AppointmentStatus::Completed,
            Outcome::NoShow => AppointmentStatus::NoShow,
        };
        current.updated_at = now;
        state.appointments.insert(appointment_id, current.clone());

        let next = Next::Emit(BookingAction::AppointmentCommitted {
            correlation_id,
            appointment: current.clone(),
        });
        smallvec![write_through(
            env,
            correlation_id,
            Write::Update { current, previous },
            next
        )]
    }

    fn reap_expired(
        state: &mut BookingState,
        correlation_id: Uuid,
        env: &BookingEnvironment,
    ) -> Effects {
        let now = env.clock.now();
        let expired: Vec<AppointmentId> = state
            .appointments
            .values()
            .filter(|a| a.is_expired_draft(now))
            .map(|a| a.id)
            .collect();

        for id in &expired {
            state.appointments.remove(id);
        }

        if expired.is_empty() {
            return smallvec![Effect::emit(BookingAction::DraftsReaped {
                correlation_id,
                removed: expired,
            })];
        }

        tracing::info!(%correlation_id, count = expired.len(), "Reaping expired drafts");

        let repository = Arc::clone(&env.repository);
        smallvec![Effect::future(async move {
            for id in &expired {
                if let Err(error) = repository.delete(*id).await {
                    tracing::warn!(appointment_id = %id, %error, "Failed to delete expired draft");
                }
            }
            Some(BookingAction::DraftsReaped {
                correlation_id,
                removed: expired,
            })
        })]
    }

    fn meeting_resolved(
        state: &mut BookingState,
        correlation_id: Uuid,
        appointment_id: AppointmentId,
        result: Result<MeetingLink, MeetingError>,
        env: &BookingEnvironment,
    ) -> Effects {
        let Some(appointment) = state.appointments.get_mut(&appointment_id) else {
            return Self::reject(
                correlation_id,
                BookingError::appointment_not_found(appointment_id),
            );
        };

        appointment.meeting = match result {
            Ok(link) => MeetingInfo {
                status: MeetingStatus::Created,
                url: Some(link.url),
                external_id: Some(link.id),
                error: None,
            },
            Err(error) => {
                tracing::warn!(
                    %correlation_id,
                    %appointment_id,
                    %error,
                    "Meeting creation failed; appointment kept"
                );
                MeetingInfo {
                    status: MeetingStatus::Failed,
                    url: None,
                    external_id: None,
                    error: Some(error.to_string()),
                }
            },
        };
        appointment.updated_at = env.clock.now();
        let appointment = appointment.clone();

        let repository = Arc::clone(&env.repository);
        smallvec![Effect::future(async move {
            if let Err(error) = repository.update(appointment.clone()).await {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    %error,
                    "Meeting details not persisted"
                );
            }
            Some(BookingAction::AppointmentCommitted {
                correlation_id,
                appointment,
            })
        })]
    }

    fn persist_failed(
        state: &mut BookingState,
        correlation_id: Uuid,
        appointment_id: AppointmentId,
        rollback: Rollback,
        error: &str,
    ) -> Effects {
        tracing::error!(
            %correlation_id,
            %appointment_id,
            error,
            "Write-through failed; rolling back"
        );
        match rollback {
            Rollback::Remove => {
                state.appointments.remove(&appointment_id);
            },
            Rollback::Restore(previous) => {
                state.appointments.insert(previous.id, *previous);
            },
        }
        smallvec![Effect::emit(BookingAction::BookingFailed {
            correlation_id,
            error: BookingError::Storage(error.to_string()),
        })]
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut BookingState,
        action: BookingAction,
        env: &BookingEnvironment,
    ) -> Effects {
        match action {
            BookingAction::CreateAndConfirm {
                correlation_id,
                request,
            } => Self::take_slot(state, correlation_id, request, env, false),

            BookingAction::HoldSlot {
                correlation_id,
                request,
            } => Self::take_slot(state, correlation_id, request, env, true),

            BookingAction::ConfirmDraft {
                correlation_id,
                appointment_id,
                identity_id,
            } => Self::confirm_draft(state, correlation_id, appointment_id, identity_id, env),

            BookingAction::CancelOrDelete {
                correlation_id,
                appointment_id,
                identity_id,
            } => Self::cancel_or_delete(state, correlation_id, appointment_id, identity_id, env),

            BookingAction::MarkOutcome {
                correlation_id,
                appointment_id,
                outcome,
            } => Self::mark_outcome(state, correlation_id, appointment_id, outcome, env),

            BookingAction::ReapExpiredDrafts { correlation_id } => {
                Self::reap_expired(state, correlation_id, env)
            },

            BookingAction::MeetingResolved {
                correlation_id,
                appointment_id,
                result,
            } => Self::meeting_resolved(state, correlation_id, appointment_id, result, env),

            BookingAction::PersistFailed {
                correlation_id,
                appointment_id,
                rollback,
                error,
            } => Self::persist_failed(state, correlation_id, appointment_id, rollback, &error),

            // Terminal results only inform observers
            BookingAction::AppointmentCommitted { .. }
            | BookingAction::AppointmentCancelled { .. }
            | BookingAction::DraftsReaped { .. }
            | BookingAction::BookingFailed { .. } => smallvec![Effect::None],
        }
    }
}

fn owned_appointment(
    state: &BookingState,
    appointment_id: AppointmentId,
    identity_id: IdentityId,
) -> Result<&Appointment, BookingError> {
    let appointment = state
        .appointments
        .get(&appointment_id)
        .ok_or_else(|| BookingError::appointment_not_found(appointment_id))?;
    if appointment.identity_id != identity_id {
        return Err(BookingError::Forbidden);
    }
    Ok(appointment)
}

fn meeting_info_for(resource: &CalendarResource) -> MeetingInfo {
    if resource.meeting_profile.is_some() {
        MeetingInfo::pending()
    } else {
        MeetingInfo::not_required()
    }
}

fn meeting_request(
    resource: &CalendarResource,
    appointment: &Appointment,
) -> Option<MeetingRequest> {
    resource.meeting_profile.as_ref().map(|profile| MeetingRequest {
        appointment_id: appointment.id,
        profile: profile.clone(),
        topic: format!(
            "{} - {}",
            profile.topic.as_deref().unwrap_or("Appointment"),
            resource.name
        ),
        start: appointment.start,
        end: appointment.end,
    })
}

/// Persist `write`, then either emit `next` or create the meeting.
///
/// A failed write comes back as [`BookingAction::PersistFailed`] carrying the
/// rollback for the in-memory change. The meeting call is bounded by
/// [`BookingConfig::meeting_budget`](crate::config::BookingConfig::meeting_budget)
/// and never fails the command.
fn write_through(
    env: &BookingEnvironment,
    correlation_id: Uuid,
    write: Write,
    next: Next,
) -> Effect<BookingAction> {
    let repository = Arc::clone(&env.repository);
    let meetings = Arc::clone(&env.meetings);
    let meeting_timeout = env.config.meeting_budget();

    Effect::future(async move {
        let (appointment_id, written, rollback) = match write {
            Write::Insert(appointment) => {
                let id = appointment.id;
                (id, repository.insert(appointment).await, Rollback::Remove)
            },
            Write::Update { current, previous } => (
                current.id,
                repository.update(current).await,
                Rollback::Restore(Box::new(previous)),
            ),
            Write::Delete { previous } => (
                previous.id,
                repository.delete(previous.id).await,
                Rollback::Restore(Box::new(previous)),
            ),
        };

        if let Err(error) = written {
            return Some(BookingAction::PersistFailed {
                correlation_id,
                appointment_id,
                rollback,
                error: error.to_string(),
            });
        }

        match next {
            Next::Emit(action) => Some(action),
            Next::Meeting(request) => {
                let result =
                    match tokio::time::timeout(meeting_timeout, meetings.create_meeting(request))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(MeetingError::Timeout),
                    };
                Some(BookingAction::MeetingResolved {
                    correlation_id,
                    appointment_id,
                    result,
                })
            },
        }
    })
}
