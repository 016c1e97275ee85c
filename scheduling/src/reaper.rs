//! Periodic deletion of expired drafts.
//!
//! Expired drafts already count for nothing at read and commit time; the
//! reaper only keeps the state and the repository from growing.

use crate::booking::BookingService;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background task that sends `ReapExpiredDrafts` on a fixed interval.
#[derive(Debug, Clone)]
pub struct DraftReaper {
    service: BookingService,
    interval: Duration,
}

impl DraftReaper {
    /// Create a reaper for `service`.
    #[must_use]
    pub const fn new(service: BookingService, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run one pass.
    ///
    /// Returns the number of drafts deleted; failures are logged.
    pub async fn run_once(&self) -> usize {
        match self.service.reap_expired_drafts().await {
            Ok(removed) => {
                if !removed.is_empty() {
                    tracing::info!(count = removed.len(), "Expired drafts reaped");
                }
                removed.len()
            },
            Err(error) => {
                tracing::warn!(%error, "Draft reaper pass failed");
                0
            },
        }
    }

    /// Spawn the loop. It stops once `shutdown` turns `true` or its sender
    /// is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(interval_secs = self.interval.as_secs(), "Draft reaper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Draft reaper stopped");
        })
    }
}
