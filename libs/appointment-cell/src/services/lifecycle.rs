// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{
    Actor, ActorRole, Appointment, AppointmentAction, AppointmentError, AppointmentPatch,
    AppointmentStatus, CreateAppointmentRequest,
};

/// Decides whether a status change is allowed and what it writes. Holds no state;
/// the caller commits the returned patch.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;

        match current_status {
            Pending => &[Booked, Accepted, Rejected, Cancelled],
            Booked => &[Accepted, Rejected, Rescheduled, Cancelled],
            Accepted => &[Rescheduled, Cancelled, Completed],
            Rescheduled => &[Accepted, Rejected, Rescheduled, Cancelled],
            // Terminal states - no transitions allowed
            Rejected | Cancelled | Completed => &[],
        }
    }

    pub fn is_legal_transition(&self, from: AppointmentStatus, to: AppointmentStatus) -> bool {
        self.get_valid_transitions(from).contains(&to)
    }

    /// Validate that `action` may be applied to an appointment currently in `current_status`
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        action: AppointmentAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        let target = action.target_status();
        debug!("Validating status transition from {} to {}", current_status, target);

        if !self.is_legal_transition(current_status, target) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, target);
            return Err(AppointmentError::IllegalTransition {
                from: current_status,
                action,
            });
        }

        Ok(target)
    }

    /// Who may issue `action` against `appointment`.
    pub fn authorize(
        &self,
        action: AppointmentAction,
        appointment: &Appointment,
        actor: &Actor,
    ) -> Result<(), AppointmentError> {
        let allowed = match action {
            AppointmentAction::Book
            | AppointmentAction::Accept
            | AppointmentAction::Reject
            | AppointmentAction::Complete => actor.is_assigned_doctor(appointment),
            AppointmentAction::Reschedule => actor.is_party_to(appointment),
            AppointmentAction::Cancel => actor.is_party_to(appointment) || actor.is_admin(),
        };

        if allowed {
            Ok(())
        } else {
            Err(AppointmentError::Forbidden(format!(
                "Not authorized to {} this appointment",
                action
            )))
        }
    }

    /// Status a new appointment starts in, given who is creating it.
    pub fn initial_status(
        &self,
        request: &CreateAppointmentRequest,
        actor: &Actor,
    ) -> Result<AppointmentStatus, AppointmentError> {
        match actor.role {
            ActorRole::Admin => Ok(AppointmentStatus::Pending),
            ActorRole::Patient => match request.patient_id {
                Some(patient_id) if patient_id != actor.user_id => Err(AppointmentError::Forbidden(
                    "Not authorized to book appointment for this patient".to_string(),
                )),
                _ => Ok(AppointmentStatus::Pending),
            },
            // A doctor booking into their own calendar has already confirmed the slot
            ActorRole::Doctor => match request.doctor_id {
                Some(doctor_id) if doctor_id == actor.user_id => Ok(AppointmentStatus::Booked),
                _ => Err(AppointmentError::Forbidden(
                    "Doctors can only book appointments into their own calendar".to_string(),
                )),
            },
        }
    }

    /// Run every check for `action` and return the patch to commit.
    ///
    /// Checks run in a fixed order: authorization, the requested time, transition
    /// legality, then completion timing. A bad `new_time` is rejected whatever state
    /// the record is in. The patch carries the version that was read so a concurrent
    /// writer makes the commit fail with `Conflict`.
    pub fn plan_transition(
        &self,
        action: AppointmentAction,
        appointment: &Appointment,
        actor: &Actor,
        now: DateTime<Utc>,
        new_time: Option<DateTime<Utc>>,
    ) -> Result<AppointmentPatch, AppointmentError> {
        self.authorize(action, appointment, actor)?;

        let scheduled_at = match action {
            AppointmentAction::Reschedule => Some(Self::validate_new_time(new_time, now)?),
            _ => None,
        };

        let target = self.validate_status_transition(appointment.status, action)?;

        if action == AppointmentAction::Complete && appointment.scheduled_at > now {
            return Err(AppointmentError::TooEarly {
                scheduled_at: appointment.scheduled_at,
            });
        }

        Ok(AppointmentPatch {
            status: Some(target),
            scheduled_at,
            expected_version: Some(appointment.version),
            ..Default::default()
        })
    }

    fn validate_new_time(
        new_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AppointmentError> {
        let new_time = new_time.ok_or_else(|| {
            AppointmentError::ValidationError("new_time is required to reschedule".to_string())
        })?;
        if new_time <= now {
            return Err(AppointmentError::ValidationError(
                "New appointment time must be in the future".to_string(),
            ));
        }
        Ok(new_time)
    }
}
