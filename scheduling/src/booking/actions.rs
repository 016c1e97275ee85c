//! Booking engine actions.
//!
//! Commands carry a `correlation_id` that every follow-up action repeats, so
//! a caller waiting on the store can pick its own terminal action out of the
//! broadcast.

use crate::appointment::Appointment;
use crate::error::BookingError;
use crate::providers::{MeetingError, MeetingLink};
use crate::types::{AppointmentId, BookingRequest, IdentityId, Outcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a cancel did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelAction {
    /// A draft was hard-deleted
    Deleted,
    /// A confirmed appointment was cancelled (or already was)
    Cancelled,
}

/// Result of `cancelOrDelete`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    /// Affected appointment
    pub appointment_id: AppointmentId,
    /// What happened
    pub action: CancelAction,
    /// Human-readable summary
    pub message: String,
}

/// How to undo an in-memory change whose write-through failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rollback {
    /// Drop the newly inserted appointment
    Remove,
    /// Put back the previous version
    Restore(Box<Appointment>),
}

/// Booking engine actions
#[derive(Clone, Debug)]
pub enum BookingAction {
    // Commands
    /// Book a slot and confirm it in one step
    CreateAndConfirm {
        /// Request correlation
        correlation_id: Uuid,
        /// Slot to book
        request: BookingRequest,
    },

    /// Hold a slot as a time-boxed draft
    HoldSlot {
        /// Request correlation
        correlation_id: Uuid,
        /// Slot to hold
        request: BookingRequest,
    },

    /// Confirm a held draft
    ConfirmDraft {
        /// Request correlation
        correlation_id: Uuid,
        /// Draft to confirm
        appointment_id: AppointmentId,
        /// Caller
        identity_id: IdentityId,
    },

    /// Delete a draft or cancel a confirmed appointment
    CancelOrDelete {
        /// Request correlation
        correlation_id: Uuid,
        /// Target appointment
        appointment_id: AppointmentId,
        /// Caller
        identity_id: IdentityId,
    },

    /// Record whether a confirmed appointment took place
    MarkOutcome {
        /// Request correlation
        correlation_id: Uuid,
        /// Target appointment
        appointment_id: AppointmentId,
        /// Completed or no-show
        outcome: Outcome,
    },

    /// Hard-delete every expired draft
    ReapExpiredDrafts {
        /// Request correlation
        correlation_id: Uuid,
    },

    // Effect feedback
    /// Meeting provider answered (or timed out)
    MeetingResolved {
        /// Request correlation
        correlation_id: Uuid,
        /// Appointment the meeting is for
        appointment_id: AppointmentId,
        /// Provider result
        result: Result<MeetingLink, MeetingError>,
    },

    /// Write-through to the repository failed
    PersistFailed {
        /// Request correlation
        correlation_id: Uuid,
        /// Appointment that was written
        appointment_id: AppointmentId,
        /// How to undo the in-memory change
        rollback: Rollback,
        /// Repository error
        error: String,
    },

    // Terminal results
    /// An appointment was created or changed
    AppointmentCommitted {
        /// Request correlation
        correlation_id: Uuid,
        /// Committed appointment
        appointment: Appointment,
    },

    /// A cancel completed
    AppointmentCancelled {
        /// Request correlation
        correlation_id: Uuid,
        /// What happened
        outcome: CancelOutcome,
    },

    /// The reaper finished
    DraftsReaped {
        /// Request correlation
        correlation_id: Uuid,
        /// Deleted drafts
        removed: Vec<AppointmentId>,
    },

    /// A command was rejected
    BookingFailed {
        /// Request correlation
        correlation_id: Uuid,
        /// Why
        error: BookingError,
    },
}

impl BookingAction {
    /// Correlation id shared by a command and all its follow-ups.
    #[must_use]
    pub const fn correlation_id(&self) -> Uuid {
        match self {
            Self::CreateAndConfirm { correlation_id, .. }
            | Self::HoldSlot { correlation_id, .. }
            | Self::ConfirmDraft { correlation_id, .. }
            | Self::CancelOrDelete { correlation_id, .. }
            | Self::MarkOutcome { correlation_id, .. }
            | Self::ReapExpiredDrafts { correlation_id }
            | Self::MeetingResolved { correlation_id, .. }
            | Self::PersistFailed { correlation_id, .. }
            | Self::AppointmentCommitted { correlation_id, .. }
            | Self::AppointmentCancelled { correlation_id, .. }
            | Self::DraftsReaped { correlation_id, .. }
            | Self::BookingFailed { correlation_id, .. } => *correlation_id,
        }
    }

    /// Whether this action ends a command.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AppointmentCommitted { .. }
                | Self::AppointmentCancelled { .. }
                | Self::DraftsReaped { .. }
                | Self::BookingFailed { .. }
        )
    }

    /// Whether this action ends the command with `correlation_id`.
    #[must_use]
    pub fn is_terminal_for(&self, correlation_id: &Uuid) -> bool {
        self.is_terminal() && self.correlation_id() == *correlation_id
    }
}
