//! Application assembly.

use crate::config::{Config, GuestConfig, MeetingConfig};
use anyhow::{Context, anyhow};
use service_portal_auth::providers::{ConsoleOtpSender, OtpSender, TwilioConfig, TwilioOtpSender};
use service_portal_auth::{
    GuestEnvironment, InMemoryGuestService, InMemoryIdentityRepository, InMemoryPendingOtpStore,
};
use service_portal_core::environment::SystemClock;
use service_portal_scheduling::{
    BookingEnvironment, BookingService, Catalog, DraftReaper, HttpMeetingProvider,
    InMemoryAppointmentRepository, MeetingProvider, UnconfiguredMeetingProvider,
};
use service_portal_web::AppState;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Everything `main` needs to serve.
#[derive(Debug)]
pub struct Services {
    /// Router state
    pub state: AppState,
    /// Draft reaper, not yet spawned
    pub reaper: DraftReaper,
}

/// Read and validate the catalog file.
///
/// # Errors
///
/// Returns error if the file cannot be read or the catalog is invalid.
pub fn load_catalog(path: impl AsRef<Path>) -> anyhow::Result<Catalog> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    let catalog = Catalog::from_json(&json)
        .with_context(|| format!("loading catalog {}", path.display()))?;
    info!(
        plans = catalog.plans.len(),
        resources = catalog.resources.len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

/// Twilio when credentials are configured, the console otherwise.
///
/// # Errors
///
/// Returns error if the Twilio client cannot be built.
pub fn otp_sender(config: &GuestConfig) -> anyhow::Result<Arc<dyn OtpSender>> {
    let Some((account_sid, auth_token)) = config.twilio_credentials() else {
        if config.otp.enabled {
            warn!("No Twilio credentials; verification codes are written to the log");
        }
        return Ok(Arc::new(ConsoleOtpSender::new()));
    };

    let mut twilio = TwilioConfig::new(account_sid, auth_token);
    if let Some(from) = &config.otp.sms_sender {
        twilio = twilio.with_sms_from(from.as_str());
    }
    if let Some(from) = &config.otp.whatsapp_sender {
        twilio = twilio.with_whatsapp_from(from.as_str());
    }
    let sender = TwilioOtpSender::new(twilio)
        .map_err(|e| anyhow!("building Twilio sender: {e}"))?;
    info!("Verification codes delivered through Twilio");
    Ok(Arc::new(sender))
}

/// HTTP meeting provider when a URL is configured.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built.
pub fn meeting_provider(config: &MeetingConfig) -> anyhow::Result<Arc<dyn MeetingProvider>> {
    let Some(url) = &config.url else {
        info!("No meeting provider configured; online resources will not get links");
        return Ok(Arc::new(UnconfiguredMeetingProvider));
    };

    let provider = HttpMeetingProvider::new(
        url.as_str(),
        config.api_key.clone(),
        Duration::from_secs(config.timeout_secs),
    )
    .map_err(|e| anyhow!("building meeting provider: {e}"))?;
    info!(url = %url, "Meeting provider configured");
    Ok(Arc::new(provider))
}

/// Start the booking engine and guest sessions.
///
/// # Errors
///
/// Returns error if a provider cannot be built or the engine fails to load
/// the catalog.
pub async fn build(config: &Config, catalog: Catalog) -> anyhow::Result<Services> {
    let clock = Arc::new(SystemClock);

    let booking_env = BookingEnvironment::new(
        clock.clone(),
        Arc::new(InMemoryAppointmentRepository::new()),
        meeting_provider(&config.meetings)?,
        config.booking(),
    );
    let booking = BookingService::start(catalog, booking_env)
        .await
        .context("starting booking engine")?;

    let guests = InMemoryGuestService::new(GuestEnvironment::new(
        InMemoryIdentityRepository::new(),
        InMemoryPendingOtpStore::new(),
        otp_sender(&config.guests)?,
        clock,
        config.guest_auth(),
    ));

    let reaper = DraftReaper::new(
        booking.clone(),
        Duration::from_secs(config.reaper_interval_secs),
    );

    Ok(Services {
        state: AppState::new(booking, guests),
        reaper,
    })
}
