//! One-time code delivery.

use crate::config::OtpChannel;
use std::future::Future;
use std::pin::Pin;
use tracing::info;

/// Boxed future returned by [`OtpSender`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

/// Delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// No sender number is configured for the channel.
    #[error("channel {0} is not configured")]
    ChannelNotConfigured(&'static str),
    /// The gateway could not be reached.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    /// The gateway refused the message.
    #[error("gateway rejected the message: {0}")]
    Rejected(String),
}

/// A code ready to be sent.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpMessage {
    /// Destination phone as entered by the guest
    pub to: String,
    /// Channel to use
    pub channel: OtpChannel,
    /// Plain code
    pub code: String,
    /// Minutes until the code expires
    pub expiry_minutes: u32,
}

impl OtpMessage {
    /// Text body sent to the guest.
    #[must_use]
    pub fn body(&self) -> String {
        format!(
            "Your verification code is {}. It expires in {} minutes.",
            self.code, self.expiry_minutes
        )
    }
}

impl std::fmt::Debug for OtpMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpMessage")
            .field("to", &crate::crypto::mask_phone(&self.to))
            .field("channel", &self.channel)
            .field("code", &"<redacted>")
            .field("expiry_minutes", &self.expiry_minutes)
            .finish()
    }
}

/// Sends one-time codes.
///
/// Object safe so the binary can choose an implementation at startup.
pub trait OtpSender: Send + Sync {
    /// Deliver `message`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the message could not be handed to the
    /// gateway.
    fn send<'a>(&'a self, message: &'a OtpMessage) -> SendFuture<'a>;
}

/// Development sender that writes codes to the log.
///
/// The only place a plain code is ever logged.
#[derive(Clone, Debug, Default)]
pub struct ConsoleOtpSender;

impl ConsoleOtpSender {
    /// Create a console sender.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OtpSender for ConsoleOtpSender {
    fn send<'a>(&'a self, message: &'a OtpMessage) -> SendFuture<'a> {
        Box::pin(async move {
            info!(
                to = %message.to,
                channel = message.channel.as_str(),
                code = %message.code,
                expires_in = message.expiry_minutes,
                "📱 One-time code (development mode)"
            );
            Ok(())
        })
    }
}
