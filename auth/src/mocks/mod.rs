//! Mock provider implementations for testing.

pub mod otp_sender;

pub use otp_sender::MockOtpSender;
