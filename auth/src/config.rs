//! Guest session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delivery channel for one-time codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    /// Text message
    Sms,
    /// `WhatsApp` message
    Whatsapp,
}

impl OtpChannel {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl std::str::FromStr for OtpChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(format!("unknown OTP channel '{other}'")),
        }
    }
}

/// One-time code settings.
///
/// # Example
///
/// ```
/// use service_portal_auth::config::{OtpChannel, OtpSettings};
///
/// let settings = OtpSettings::new()
///     .with_enabled(true)
///     .with_otp_length(6)
///     .with_sms_sender("+15550001111");
/// assert!(settings.channel_available(OtpChannel::Sms));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSettings {
    /// Whether sign-in and registration require a code
    pub enabled: bool,
    /// Digits per code (4..=8)
    pub otp_length: u8,
    /// Code lifetime in minutes
    pub expiry_minutes: u32,
    /// Wrong codes allowed before lockout
    pub max_verification_attempts: u32,
    /// Lockout length in minutes
    pub lockout_minutes: u32,
    /// Codes issued per phone per hour
    pub max_requests_per_hour: u32,
    /// Minimum gap between two sends to the same phone
    pub resend_cooldown_seconds: u32,
    /// Channel used when the caller does not pick one
    pub default_channel: OtpChannel,
    /// Sender number for SMS
    pub sms_sender: Option<String>,
    /// Sender number for `WhatsApp`
    pub whatsapp_sender: Option<String>,
}

impl OtpSettings {
    /// Defaults: disabled, 6 digits, 5 minute expiry, 5 attempts, 30 minute
    /// lockout, 3 requests per hour, 60 s cooldown, SMS.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: false,
            otp_length: 6,
            expiry_minutes: 5,
            max_verification_attempts: 5,
            lockout_minutes: 30,
            max_requests_per_hour: 3,
            resend_cooldown_seconds: 60,
            default_channel: OtpChannel::Sms,
            sms_sender: None,
            whatsapp_sender: None,
        }
    }

    /// Turn code verification on or off.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the code length, clamped to 4..=8.
    #[must_use]
    pub fn with_otp_length(mut self, length: u8) -> Self {
        self.otp_length = length.clamp(4, 8);
        self
    }

    /// Set the code lifetime.
    #[must_use]
    pub const fn with_expiry_minutes(mut self, minutes: u32) -> Self {
        self.expiry_minutes = minutes;
        self
    }

    /// Set the wrong-code allowance.
    #[must_use]
    pub const fn with_max_verification_attempts(mut self, attempts: u32) -> Self {
        self.max_verification_attempts = attempts;
        self
    }

    /// Set the lockout length.
    #[must_use]
    pub const fn with_lockout_minutes(mut self, minutes: u32) -> Self {
        self.lockout_minutes = minutes;
        self
    }

    /// Set the hourly request allowance.
    #[must_use]
    pub const fn with_max_requests_per_hour(mut self, max: u32) -> Self {
        self.max_requests_per_hour = max;
        self
    }

    /// Set the resend cooldown.
    #[must_use]
    pub const fn with_resend_cooldown_seconds(mut self, seconds: u32) -> Self {
        self.resend_cooldown_seconds = seconds;
        self
    }

    /// Set the default channel.
    #[must_use]
    pub const fn with_default_channel(mut self, channel: OtpChannel) -> Self {
        self.default_channel = channel;
        self
    }

    /// Set the SMS sender number.
    #[must_use]
    pub fn with_sms_sender(mut self, from: impl Into<String>) -> Self {
        self.sms_sender = Some(from.into());
        self
    }

    /// Set the `WhatsApp` sender number.
    #[must_use]
    pub fn with_whatsapp_sender(mut self, from: impl Into<String>) -> Self {
        self.whatsapp_sender = Some(from.into());
        self
    }

    /// Whether a sender number is configured for `channel`.
    #[must_use]
    pub const fn channel_available(&self, channel: OtpChannel) -> bool {
        match channel {
            OtpChannel::Sms => self.sms_sender.is_some(),
            OtpChannel::Whatsapp => self.whatsapp_sender.is_some(),
        }
    }

    /// Sender number for `channel`.
    #[must_use]
    pub fn sender_for(&self, channel: OtpChannel) -> Option<&str> {
        match channel {
            OtpChannel::Sms => self.sms_sender.as_deref(),
            OtpChannel::Whatsapp => self.whatsapp_sender.as_deref(),
        }
    }

    /// Settings safe to show to unauthenticated clients.
    #[must_use]
    pub fn public(&self) -> PublicOtpSettings {
        if !self.enabled {
            return PublicOtpSettings {
                enabled: false,
                otp_length: None,
                otp_expiry_minutes: None,
                default_channel: None,
                sms_available: None,
                whatsapp_available: None,
            };
        }
        PublicOtpSettings {
            enabled: true,
            otp_length: Some(self.otp_length),
            otp_expiry_minutes: Some(self.expiry_minutes),
            default_channel: Some(self.default_channel),
            sms_available: Some(self.channel_available(OtpChannel::Sms)),
            whatsapp_available: Some(self.channel_available(OtpChannel::Whatsapp)),
        }
    }
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-visible OTP settings. Only `enabled` is present when disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicOtpSettings {
    /// Whether codes are required
    pub enabled: bool,
    /// Digits per code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_length: Option<u8>,
    /// Code lifetime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_expiry_minutes: Option<u32>,
    /// Default channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<OtpChannel>,
    /// SMS delivery configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_available: Option<bool>,
    /// `WhatsApp` delivery configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_available: Option<bool>,
}

/// Guest session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestAuthConfig {
    /// One-time code settings
    pub otp: OtpSettings,
    /// Tokens older than this are rejected and cleared
    pub token_max_age: chrono::Duration,
    /// How long a caller waits for the session engine
    pub request_timeout: Duration,
}

impl GuestAuthConfig {
    /// Defaults: OTP disabled, 30 day tokens, 30 s request timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            otp: OtpSettings::new(),
            token_max_age: chrono::Duration::days(30),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set the OTP settings.
    #[must_use]
    pub fn with_otp(mut self, otp: OtpSettings) -> Self {
        self.otp = otp;
        self
    }

    /// Set the token lifetime.
    #[must_use]
    pub const fn with_token_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.token_max_age = max_age;
        self
    }

    /// Set the command timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for GuestAuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_length_clamped() {
        assert_eq!(OtpSettings::new().with_otp_length(2).otp_length, 4);
        assert_eq!(OtpSettings::new().with_otp_length(12).otp_length, 8);
    }

    #[test]
    fn test_public_settings_hide_details_when_disabled() {
        let json = serde_json::to_value(OtpSettings::new().public()).unwrap();
        assert_eq!(json, serde_json::json!({ "enabled": false }));
    }

    #[test]
    fn test_public_settings_when_enabled() {
        let settings = OtpSettings::new()
            .with_enabled(true)
            .with_whatsapp_sender("+15550002222");
        let public = settings.public();
        assert_eq!(public.otp_length, Some(6));
        assert_eq!(public.sms_available, Some(false));
        assert_eq!(public.whatsapp_available, Some(true));
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("WhatsApp".parse::<OtpChannel>(), Ok(OtpChannel::Whatsapp));
        assert!("fax".parse::<OtpChannel>().is_err());
    }
}
