//! Test doubles for the booking engine's providers.

use crate::appointment::Appointment;
use crate::providers::{
    AppointmentRepository, MeetingError, MeetingLink, MeetingProvider, MeetingRequest,
    ProviderFuture, RepositoryError,
};
use crate::stores::InMemoryAppointmentRepository;
use crate::types::AppointmentId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Configurable meeting provider.
#[derive(Debug, Clone, Default)]
pub struct MockMeetingProvider {
    fail_with: Option<MeetingError>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<MeetingRequest>>>,
}

impl MockMeetingProvider {
    /// A provider that always succeeds.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A provider that always fails with `error`.
    #[must_use]
    pub fn failing(error: MeetingError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    /// Sleep for `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<MeetingRequest> {
        self.requests.lock().await.clone()
    }
}

impl MeetingProvider for MockMeetingProvider {
    fn create_meeting(
        &self,
        request: MeetingRequest,
    ) -> ProviderFuture<'_, Result<MeetingLink, MeetingError>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let id = request.appointment_id.to_string();
            self.requests.lock().await.push(request);
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(MeetingLink {
                    url: format!("https://meet.test/{id}"),
                    id,
                }),
            }
        })
    }
}

/// Repository that can be switched into failing mode.
///
/// Delegates to an [`InMemoryAppointmentRepository`] while healthy.
#[derive(Debug, Clone, Default)]
pub struct FlakyAppointmentRepository {
    inner: InMemoryAppointmentRepository,
    failing: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl FlakyAppointmentRepository {
    /// A healthy repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The backing repository.
    #[must_use]
    pub const fn inner(&self) -> &InMemoryAppointmentRepository {
        &self.inner
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("repository offline".into()))
        } else {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

impl AppointmentRepository for FlakyAppointmentRepository {
    fn insert(&self, appointment: Appointment) -> ProviderFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            self.check()?;
            self.inner.insert(appointment).await
        })
    }

    fn update(&self, appointment: Appointment) -> ProviderFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            self.check()?;
            self.inner.update(appointment).await
        })
    }

    fn delete(&self, id: AppointmentId) -> ProviderFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            self.check()?;
            self.inner.delete(id).await
        })
    }

    fn load_all(&self) -> ProviderFuture<'_, Result<Vec<Appointment>, RepositoryError>> {
        self.inner.load_all()
    }
}
