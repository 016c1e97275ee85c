//! Guest session providers.
//!
//! Traits for every external dependency of the session reducer. The
//! reducer only talks to these; the binary picks the implementations.
//!
//! - [`IdentityRepository`]: guest identities and their token hash
//! - [`PendingOtpStore`]: codes awaiting verification, consumed atomically
//! - [`OtpSender`]: SMS / `WhatsApp` delivery, with a console sender for
//!   development and a Twilio sender for production
//! - [`RateLimiter`]: fixed-window limits per key (client IP)

pub mod identity;
pub mod otp_sender;
pub mod otp_store;
pub mod rate_limiter;
pub mod twilio;

pub use identity::IdentityRepository;
pub use otp_sender::{ConsoleOtpSender, DeliveryError, OtpMessage, OtpSender};
pub use otp_store::PendingOtpStore;
pub use rate_limiter::RateLimiter;
pub use twilio::{TwilioConfig, TwilioOtpSender};
