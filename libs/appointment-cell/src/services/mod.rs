pub mod booking;
pub mod clock;
pub mod lifecycle;
pub mod presentation;
pub mod store;

pub use booking::AppointmentBookingService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use lifecycle::AppointmentLifecycleService;
pub use presentation::status_presentation;
pub use store::{AppointmentStore, InMemoryAppointmentStore};
