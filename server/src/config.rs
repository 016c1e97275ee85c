//! Configuration management for the portal server.
//!
//! Loads configuration from `PORTAL_*` environment variables. Every value
//! has a default; a value that does not parse falls back to it.

use service_portal_auth::{GuestAuthConfig, OtpChannel, OtpSettings};
use service_portal_scheduling::BookingConfig;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server
    pub server: ServerConfig,
    /// One-time codes and tokens
    pub guests: GuestConfig,
    /// Meeting provider
    pub meetings: MeetingConfig,
    /// Draft reaper period in seconds
    pub reaper_interval_secs: u64,
    /// Path of the resource catalog JSON
    pub catalog_path: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// How long a request waits for an engine reply, in seconds
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
    /// Separate Prometheus listener (`host:port`); `/metrics` is served on
    /// the main listener when unset
    pub metrics_addr: Option<String>,
}

/// Guest session configuration
#[derive(Clone)]
pub struct GuestConfig {
    /// One-time code settings
    pub otp: OtpSettings,
    /// Token lifetime in days
    pub token_max_age_days: i64,
    /// Twilio account SID
    pub twilio_account_sid: Option<String>,
    /// Twilio auth token
    pub twilio_auth_token: Option<String>,
}

impl std::fmt::Debug for GuestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestConfig")
            .field("otp", &self.otp)
            .field("token_max_age_days", &self.token_max_age_days)
            .field("twilio_configured", &self.twilio_credentials().is_some())
            .finish()
    }
}

impl GuestConfig {
    /// Account SID and auth token, when both are set.
    #[must_use]
    pub fn twilio_credentials(&self) -> Option<(&str, &str)> {
        self.twilio_account_sid
            .as_deref()
            .zip(self.twilio_auth_token.as_deref())
    }
}

/// Meeting provider configuration
#[derive(Clone)]
pub struct MeetingConfig {
    /// Base URL of the meeting service; meetings fail when unset
    pub url: Option<String>,
    /// Bearer key for the meeting service
    pub api_key: Option<String>,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MeetingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeetingConfig")
            .field("url", &self.url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let vars = Vars(lookup);
        let text = |key: &str| vars.text(key);

        let defaults = OtpSettings::new();
        let mut otp = OtpSettings::new()
            .with_enabled(vars.parsed("PORTAL_OTP_ENABLED").unwrap_or(defaults.enabled))
            .with_otp_length(vars.parsed("PORTAL_OTP_LENGTH").unwrap_or(defaults.otp_length))
            .with_expiry_minutes(
                vars.parsed("PORTAL_OTP_EXPIRY_MINUTES").unwrap_or(defaults.expiry_minutes),
            )
            .with_max_verification_attempts(
                vars.parsed("PORTAL_OTP_MAX_ATTEMPTS")
                    .unwrap_or(defaults.max_verification_attempts),
            )
            .with_lockout_minutes(
                vars.parsed("PORTAL_OTP_LOCKOUT_MINUTES").unwrap_or(defaults.lockout_minutes),
            )
            .with_max_requests_per_hour(
                vars.parsed("PORTAL_OTP_MAX_REQUESTS_PER_HOUR")
                    .unwrap_or(defaults.max_requests_per_hour),
            )
            .with_resend_cooldown_seconds(
                vars.parsed("PORTAL_OTP_RESEND_COOLDOWN_SECONDS")
                    .unwrap_or(defaults.resend_cooldown_seconds),
            )
            .with_default_channel(
                vars.parsed::<OtpChannel>("PORTAL_OTP_DEFAULT_CHANNEL")
                    .unwrap_or(defaults.default_channel),
            );
        if let Some(from) = text("PORTAL_OTP_SMS_FROM") {
            otp = otp.with_sms_sender(from);
        }
        if let Some(from) = text("PORTAL_OTP_WHATSAPP_FROM") {
            otp = otp.with_whatsapp_sender(from);
        }

        Self {
            server: ServerConfig {
                host: text("PORTAL_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: vars.parsed("PORTAL_PORT").unwrap_or(8080),
                request_timeout_secs: vars.parsed("PORTAL_REQUEST_TIMEOUT_SECS").unwrap_or(30),
                shutdown_timeout_secs: vars.parsed("PORTAL_SHUTDOWN_TIMEOUT_SECS").unwrap_or(30),
                metrics_addr: text("PORTAL_METRICS_ADDR"),
            },
            guests: GuestConfig {
                otp,
                token_max_age_days: vars
                    .parsed("PORTAL_TOKEN_MAX_AGE_DAYS")
                    .filter(|days: &i64| *days > 0)
                    .filter(|days| token_age(*days).is_some())
                    .unwrap_or(30),
                twilio_account_sid: text("PORTAL_TWILIO_ACCOUNT_SID"),
                twilio_auth_token: text("PORTAL_TWILIO_AUTH_TOKEN"),
            },
            meetings: MeetingConfig {
                url: text("PORTAL_MEETING_URL"),
                api_key: text("PORTAL_MEETING_API_KEY"),
                timeout_secs: vars.parsed("PORTAL_MEETING_TIMEOUT_SECS").unwrap_or(10),
            },
            reaper_interval_secs: vars
                .parsed("PORTAL_REAPER_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(60),
            catalog_path: text("PORTAL_CATALOG_PATH")
                .unwrap_or_else(|| "catalog.json".to_string()),
        }
    }

    /// `host:port` of the main listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Booking engine settings.
    ///
    /// Meeting calls are capped at half the request timeout.
    #[must_use]
    pub fn booking(&self) -> BookingConfig {
        let config = BookingConfig::new()
            .with_meeting_timeout(Duration::from_secs(self.meetings.timeout_secs))
            .with_request_timeout(Duration::from_secs(self.server.request_timeout_secs))
            .with_reaper_interval(Duration::from_secs(self.reaper_interval_secs));
        if config.meeting_budget() < config.meeting_timeout {
            tracing::warn!(
                meeting_timeout_secs = self.meetings.timeout_secs,
                request_timeout_secs = self.server.request_timeout_secs,
                budget_ms = u64::try_from(config.meeting_budget().as_millis()).unwrap_or(u64::MAX),
                "Meeting timeout capped below the request timeout"
            );
        }
        config
    }

    /// Guest session settings.
    #[must_use]
    pub fn guest_auth(&self) -> GuestAuthConfig {
        let max_age = token_age(self.guests.token_max_age_days).unwrap_or_else(|| {
            tracing::warn!(
                days = self.guests.token_max_age_days,
                "Token max age out of range, using 30 days"
            );
            chrono::Duration::days(30)
        });
        GuestAuthConfig::new()
            .with_otp(self.guests.otp.clone())
            .with_token_max_age(max_age)
            .with_request_timeout(Duration::from_secs(self.server.request_timeout_secs))
    }
}

fn token_age(days: i64) -> Option<chrono::Duration> {
    chrono::Duration::try_days(days)
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn text(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let value = self.text(key)?;
        let parsed = value.trim().parse().ok();
        if parsed.is_none() {
            tracing::warn!(key, value = %value, "Ignoring unparseable setting");
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(!config.guests.otp.enabled);
        assert_eq!(config.guests.token_max_age_days, 30);
        assert_eq!(config.reaper_interval_secs, 60);
        assert_eq!(config.catalog_path, "catalog.json");
        assert!(config.meetings.url.is_none());
        assert!(config.guests.twilio_credentials().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORTAL_PORT", "9000"),
            ("PORTAL_OTP_ENABLED", "true"),
            ("PORTAL_OTP_LENGTH", "8"),
            ("PORTAL_OTP_DEFAULT_CHANNEL", "WhatsApp"),
            ("PORTAL_OTP_WHATSAPP_FROM", "+15550002222"),
            ("PORTAL_TWILIO_ACCOUNT_SID", "AC123"),
            ("PORTAL_TWILIO_AUTH_TOKEN", "secret"),
        ]);
        assert_eq!(config.server.port, 9000);
        assert!(config.guests.otp.enabled);
        assert_eq!(config.guests.otp.otp_length, 8);
        assert_eq!(config.guests.otp.default_channel, OtpChannel::Whatsapp);
        assert!(config.guests.otp.channel_available(OtpChannel::Whatsapp));
        assert_eq!(config.guests.twilio_credentials(), Some(("AC123", "secret")));
        assert!(!format!("{:?}", config.guests).contains("secret"));
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config(&[
            ("PORTAL_PORT", "eighty"),
            ("PORTAL_REAPER_INTERVAL_SECS", "0"),
            ("PORTAL_TOKEN_MAX_AGE_DAYS", "-3"),
            ("PORTAL_OTP_DEFAULT_CHANNEL", "pigeon"),
        ]);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.reaper_interval_secs, 60);
        assert_eq!(config.guests.token_max_age_days, 30);
        assert_eq!(config.guests.otp.default_channel, OtpChannel::Sms);
    }

    #[test]
    fn test_engine_settings() {
        let config = config(&[("PORTAL_REQUEST_TIMEOUT_SECS", "5")]);
        assert_eq!(config.booking().request_timeout, Duration::from_secs(5));
        assert_eq!(config.guest_auth().token_max_age, chrono::Duration::days(30));
    }

    #[test]
    fn test_meeting_timeout_capped_by_request_timeout() {
        let config = config(&[
            ("PORTAL_MEETING_TIMEOUT_SECS", "5"),
            ("PORTAL_REQUEST_TIMEOUT_SECS", "1"),
        ]);
        let booking = config.booking();
        assert_eq!(booking.meeting_timeout, Duration::from_secs(5));
        assert_eq!(booking.meeting_budget(), Duration::from_millis(500));
        assert!(booking.meeting_budget() < booking.request_timeout);
    }

    #[test]
    fn test_huge_token_max_age_falls_back() {
        let config = config(&[("PORTAL_TOKEN_MAX_AGE_DAYS", "9223372036854775807")]);
        assert_eq!(config.guests.token_max_age_days, 30);
        assert_eq!(config.guest_auth().token_max_age, chrono::Duration::days(30));

        let mut config = config;
        config.guests.token_max_age_days = i64::MAX;
        assert_eq!(config.guest_auth().token_max_age, chrono::Duration::days(30));
    }
}
