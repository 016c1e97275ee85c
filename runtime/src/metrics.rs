//! Prometheus metrics for observability and monitoring.
//!
//! Installs a global Prometheus recorder and describes the metrics emitted by
//! the store runtime, the booking engine and the guest session manager.
//!
//! # Example
//!
//! ```rust,no_run
//! use service_portal_runtime::metrics::PrometheusMetrics;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::install()?;
//! let text = metrics.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Handle to the installed Prometheus recorder.
///
/// Rendered by the `/metrics` route of the web crate.
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    /// Install the global recorder and register metric descriptions.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or a recorder is already
    /// installed in this process.
    pub fn install() -> Result<Self, MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = builder
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        register_metrics();
        tracing::info!("Prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!("store.commands.total", "Actions sent to a store");
    describe_counter!("store.effects.executed", "Effects executed, by type");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside reducers while holding the state lock"
    );

    // Booking
    describe_counter!("booking.confirmed.total", "Appointments confirmed");
    describe_counter!(
        "booking.capacity_exceeded.total",
        "Booking attempts rejected because the slot was full"
    );
    describe_counter!("booking.cancelled.total", "Appointments cancelled or deleted");
    describe_counter!("booking.meeting.failed.total", "Meeting link creation failures");
    describe_counter!("booking.drafts.reaped.total", "Expired drafts deleted by the reaper");

    // Guest sessions
    describe_counter!("otp.issued.total", "One-time codes issued");
    describe_counter!("otp.verify.failed.total", "Failed one-time code verifications");
    describe_counter!(
        "otp.locked.total",
        "Code requests or verifications refused because the phone is locked"
    );
    describe_counter!("guest.tokens.issued.total", "Bearer tokens minted");
    describe_counter!("guest.honeypot.rejected.total", "Requests rejected by the honeypot");
}
