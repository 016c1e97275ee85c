//! Mock one-time code sender.

use crate::providers::otp_sender::{DeliveryError, OtpMessage, OtpSender, SendFuture};
use std::sync::{Arc, Mutex};

/// Records every message instead of sending it, or fails on demand.
///
/// Clones share the same record, so a test keeps one handle and gives a
/// clone to the environment.
#[derive(Debug, Clone, Default)]
pub struct MockOtpSender {
    sent: Arc<Mutex<Vec<OtpMessage>>>,
    failure: Arc<Mutex<Option<DeliveryError>>>,
}

impl MockOtpSender {
    /// A sender that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that rejects every message with `error`.
    #[must_use]
    pub fn failing(error: DeliveryError) -> Self {
        let sender = Self::default();
        sender.set_failure(Some(error));
        sender
    }

    /// Start or stop failing.
    pub fn set_failure(&self, error: Option<DeliveryError>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = error;
        }
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OtpMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Code of the most recent message.
    #[must_use]
    pub fn last_code(&self) -> Option<String> {
        self.sent
            .lock()
            .ok()
            .and_then(|s| s.last().map(|m| m.code.clone()))
    }
}

impl OtpSender for MockOtpSender {
    fn send<'a>(&'a self, message: &'a OtpMessage) -> SendFuture<'a> {
        Box::pin(async move {
            let failure = self.failure.lock().ok().and_then(|f| f.clone());
            if let Some(error) = failure {
                return Err(error);
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(message.clone());
            }
            Ok(())
        })
    }
}
