//! The booking engine: a reducer over resources, plans and appointments,
//! run by a [`Store`](service_portal_runtime::Store) and fronted by
//! [`BookingService`].

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod service;
pub mod state;

pub use actions::{BookingAction, CancelAction, CancelOutcome, Rollback};
pub use environment::BookingEnvironment;
pub use reducer::BookingReducer;
pub use service::{BookingService, BookingStore, SlotListing};
pub use state::{AppointmentFilter, BookingState};
