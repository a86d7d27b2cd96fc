pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use models::{
    Actor, ActorRole, Appointment, AppointmentAction, AppointmentError, AppointmentStatus,
    AppointmentView, CreateAppointmentRequest,
};
pub use router::appointment_routes;
pub use services::{AppointmentBookingService, AppointmentStore, InMemoryAppointmentStore};
