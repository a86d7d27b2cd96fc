use crate::models::{Appointment, AppointmentStatus, AppointmentView, StatusDescriptor, StatusPresentation};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Single source of truth for how a status is labelled and colored in dashboards.
pub fn status_presentation(status: AppointmentStatus) -> StatusPresentation {
    let (label, color_token) = match status {
        AppointmentStatus::Pending => ("Pending", "warning"),
        AppointmentStatus::Booked => ("Booked", "info"),
        AppointmentStatus::Accepted => ("Accepted", "success"),
        AppointmentStatus::Rejected => ("Rejected", "danger"),
        AppointmentStatus::Rescheduled => ("Rescheduled", "accent"),
        AppointmentStatus::Cancelled => ("Cancelled", "muted"),
        AppointmentStatus::Completed => ("Completed", "primary"),
    };

    StatusPresentation { label, color_token }
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        let presentation = status_presentation(appointment.status);
        Self { appointment, presentation }
    }
}

pub fn status_table(lifecycle: &AppointmentLifecycleService) -> Vec<StatusDescriptor> {
    AppointmentStatus::ALL
        .into_iter()
        .map(|status| {
            let StatusPresentation { label, color_token } = status_presentation(status);
            StatusDescriptor {
                status,
                label,
                color_token,
                terminal: status.is_terminal(),
                next: lifecycle.get_valid_transitions(status).to_vec(),
            }
        })
        .collect()
}
