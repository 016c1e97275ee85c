//! Service portal HTTP server.
//!
//! Appointment booking and guest sessions over HTTP.

use anyhow::Context;
use axum::{Router, routing::get};
use service_portal_runtime::metrics::PrometheusMetrics;
use service_portal_server::app::{self, Services};
use service_portal_server::config::Config;
use service_portal_web::{AppState, handlers::metrics_export, router};
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,service_portal=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting service portal");

    let config = Config::from_env();
    info!(
        address = %config.bind_addr(),
        catalog = %config.catalog_path,
        otp_enabled = config.guests.otp.enabled,
        "Configuration loaded"
    );

    let metrics = match PrometheusMetrics::install() {
        Ok(metrics) => Some(metrics),
        Err(error) => {
            warn!(%error, "Metrics disabled");
            None
        },
    };

    let catalog = app::load_catalog(&config.catalog_path)?;
    let Services { mut state, reaper } = app::build(&config, catalog).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper_handle = reaper.spawn(shutdown_rx.clone());

    let metrics_handle = match (metrics, &config.server.metrics_addr) {
        (Some(metrics), Some(addr)) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding metrics listener {addr}"))?;
            info!(address = %addr, "Serving metrics");
            let metrics_app = Router::new()
                .route("/metrics", get(metrics_export))
                .with_state(state.clone().with_metrics(metrics));
            let mut stop = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                let serve = axum::serve(listener, metrics_app).with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                });
                if let Err(error) = serve.await {
                    error!(%error, "Metrics listener failed");
                }
            }))
        },
        (Some(metrics), None) => {
            state = state.with_metrics(metrics);
            None
        },
        (None, _) => None,
    };

    let app = router(state.clone());
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(address = %addr, "HTTP server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("HTTP server stopped, draining background work");
    let _ = shutdown_tx.send(true);
    if let Err(error) = reaper_handle.await {
        warn!(%error, "Draft reaper ended abnormally");
    }
    if let Some(handle) = metrics_handle {
        if let Err(error) = handle.await {
            warn!(%error, "Metrics listener ended abnormally");
        }
    }
    drain(&state, Duration::from_secs(config.server.shutdown_timeout_secs)).await;

    served.context("HTTP server failed")?;
    info!("Shutdown complete");
    Ok(())
}

async fn drain(state: &AppState, timeout: Duration) {
    if let Err(error) = state.booking.store().shutdown(timeout).await {
        warn!(%error, "Booking store did not drain");
    }
    if let Err(error) = state.guests.store().shutdown(timeout).await {
        warn!(%error, "Guest store did not drain");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(error) => {
                error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
