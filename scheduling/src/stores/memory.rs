//! In-memory appointment repository.

use crate::appointment::Appointment;
use crate::providers::{AppointmentRepository, ProviderFuture, RepositoryError};
use crate::types::AppointmentId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Appointment repository backed by a `HashMap`.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAppointmentRepository {
    appointments: Arc<Mutex<HashMap<AppointmentId, Appointment>>>,
}

impl InMemoryAppointmentRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-loaded with `appointments`.
    #[must_use]
    pub fn with_appointments(appointments: impl IntoIterator<Item = Appointment>) -> Self {
        let map = appointments.into_iter().map(|a| (a.id, a)).collect();
        Self {
            appointments: Arc::new(Mutex::new(map)),
        }
    }

    /// Number of stored appointments.
    pub async fn len(&self) -> usize {
        self.appointments.lock().await.len()
    }

    /// Whether the repository is empty.
    pub async fn is_empty(&self) -> bool {
        self.appointments.lock().await.is_empty()
    }

    /// Fetch one appointment.
    pub async fn get(&self, id: AppointmentId) -> Option<Appointment> {
        self.appointments.lock().await.get(&id).cloned()
    }
}

impl AppointmentRepository for InMemoryAppointmentRepository {
    fn insert(&self, appointment: Appointment) -> ProviderFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            let mut map = self.appointments.lock().await;
            if map.contains_key(&appointment.id) {
                return Err(RepositoryError::Conflict(format!(
                    "appointment {} already stored",
                    appointment.id
                )));
            }
            map.insert(appointment.id, appointment);
            Ok(())
        })
    }

    fn update(&self, appointment: Appointment) -> ProviderFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            self.appointments
                .lock()
                .await
                .insert(appointment.id, appointment);
            Ok(())
        })
    }

    fn delete(&self, id: AppointmentId) -> ProviderFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            self.appointments.lock().await.remove(&id);
            Ok(())
        })
    }

    fn load_all(&self) -> ProviderFuture<'_, Result<Vec<Appointment>, RepositoryError>> {
        Box::pin(async move { Ok(self.appointments.lock().await.values().cloned().collect()) })
    }
}
