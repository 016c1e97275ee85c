//! Appointment repository implementations.

pub mod memory;

pub use memory::InMemoryAppointmentRepository;
