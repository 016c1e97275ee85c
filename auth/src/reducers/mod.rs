//! Guest session reducers.

pub mod session;

pub use session::GuestSessionReducer;
