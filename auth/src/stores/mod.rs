//! In-process store implementations.
//!
//! Suitable for a single server instance; state is lost on restart.

pub mod memory;

pub use memory::{InMemoryIdentityRepository, InMemoryPendingOtpStore, InMemoryRateLimiter};
