//! # Service Portal Scheduling
//!
//! Appointment scheduling for the service portal:
//!
//! - **Availability** ([`availability`]): weekly windows with capacity
//! - **Resources** ([`resource`]): bookable calendars with a timezone, slot
//!   duration and optional meeting profile
//! - **Slot generation** ([`slots`]): pure functions turning a plan and the
//!   current appointments into slots with remaining capacity
//! - **Booking engine** ([`booking`]): a reducer that owns the appointment
//!   state machine and the capacity invariant, executed by a `Store`
//! - **Draft reaper** ([`reaper`]): periodic cleanup of expired drafts
//!
//! ## Example
//!
//! ```ignore
//! use service_portal_scheduling::{BookingEnvironment, BookingService, Catalog};
//!
//! let catalog = Catalog::from_json(&std::fs::read_to_string("catalog.json")?)?;
//! let service = BookingService::start(catalog, environment).await?;
//!
//! let slots = service.list_slots(resource_id, from, to).await?;
//! let appointment = service.create_and_confirm(request).await?;
//! ```

pub mod appointment;
pub mod availability;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod error;
pub mod meeting;
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;
pub mod providers;
pub mod reaper;
pub mod resource;
pub mod slots;
pub mod stores;
pub mod types;

pub use appointment::{Appointment, AppointmentStatus, MeetingInfo, MeetingStatus};
pub use availability::{AvailabilityPlan, WeeklySlot};
pub use booking::{
    AppointmentFilter, BookingAction, BookingEnvironment, BookingReducer, BookingService,
    BookingState, BookingStore, CancelAction, CancelOutcome, SlotListing,
};
pub use catalog::Catalog;
pub use config::BookingConfig;
pub use error::{BookingError, Result};
pub use meeting::{HttpMeetingProvider, UnconfiguredMeetingProvider};
pub use providers::{
    AppointmentRepository, MeetingError, MeetingLink, MeetingProvider, MeetingRequest,
    RepositoryError,
};
pub use reaper::DraftReaper;
pub use resource::CalendarResource;
pub use slots::Slot;
pub use stores::InMemoryAppointmentRepository;
pub use types::{
    AppointmentId, BookingRequest, IdentityId, MeetingProfile, Outcome, PlanId, ResourceId,
};
