//! Twilio REST delivery for SMS and `WhatsApp`.

use super::otp_sender::{DeliveryError, OtpMessage, OtpSender, SendFuture};
use crate::config::OtpChannel;
use crate::validation::strip_phone_separators;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio account settings.
#[derive(Clone)]
pub struct TwilioConfig {
    /// Account SID
    pub account_sid: String,
    /// Auth token
    pub auth_token: String,
    /// SMS sender number
    pub sms_from: Option<String>,
    /// `WhatsApp` sender number
    pub whatsapp_from: Option<String>,
    /// API base URL
    pub api_base: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl TwilioConfig {
    /// Settings for the public Twilio API with a 10 s timeout.
    #[must_use]
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            sms_from: None,
            whatsapp_from: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the SMS sender.
    #[must_use]
    pub fn with_sms_from(mut self, from: impl Into<String>) -> Self {
        self.sms_from = Some(from.into());
        self
    }

    /// Set the `WhatsApp` sender.
    #[must_use]
    pub fn with_whatsapp_from(mut self, from: impl Into<String>) -> Self {
        self.whatsapp_from = Some(from.into());
        self
    }

    /// Point at another API host.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("sms_from", &self.sms_from)
            .field("whatsapp_from", &self.whatsapp_from)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// Sends codes through the Twilio Messages API.
#[derive(Clone, Debug)]
pub struct TwilioOtpSender {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioOtpSender {
    /// Build a sender.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Unreachable`] if the HTTP client cannot be
    /// built.
    pub fn new(config: TwilioConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    /// `From` and `To` form values for `message`.
    fn addresses(&self, message: &OtpMessage) -> Result<(String, String), DeliveryError> {
        let to = strip_phone_separators(&message.to);
        match message.channel {
            OtpChannel::Sms => {
                let from = self
                    .config
                    .sms_from
                    .clone()
                    .ok_or(DeliveryError::ChannelNotConfigured("sms"))?;
                Ok((from, to))
            },
            OtpChannel::Whatsapp => {
                let from = self
                    .config
                    .whatsapp_from
                    .as_deref()
                    .ok_or(DeliveryError::ChannelNotConfigured("whatsapp"))?;
                Ok((format!("whatsapp:{from}"), format!("whatsapp:{to}")))
            },
        }
    }
}

impl OtpSender for TwilioOtpSender {
    fn send<'a>(&'a self, message: &'a OtpMessage) -> SendFuture<'a> {
        Box::pin(async move {
            let (from, to) = self.addresses(message)?;
            let body = message.body();
            let form = [("From", from.as_str()), ("To", to.as_str()), ("Body", body.as_str())];

            let response = self
                .client
                .post(self.messages_url())
                .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
                .form(&form)
                .send()
                .await
                .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                tracing::debug!(channel = message.channel.as_str(), "Code handed to Twilio");
                Ok(())
            } else {
                let detail = response.text().await.unwrap_or_default();
                tracing::warn!(
                    %status,
                    channel = message.channel.as_str(),
                    "Twilio rejected message"
                );
                Err(DeliveryError::Rejected(format!("{status}: {detail}")))
            }
        })
    }
}
