// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Actor, Appointment, AppointmentAction, AppointmentError, CreateAppointmentRequest,
    StatusDescriptor, StatusTransition,
};
use crate::services::clock::{Clock, SystemClock};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::presentation::status_table;
use crate::services::store::{AppointmentStore, InMemoryAppointmentStore};

/// Command/query interface over the store and the lifecycle engine. Every status
/// change goes through the engine; nothing is written unless all checks pass.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    lifecycle: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = InMemoryAppointmentStore::new(clock.clone())
            .with_max_reason_length(config.max_reason_length);
        Self::with_store(Arc::new(store), clock)
    }

    pub fn with_store(store: Arc<dyn AppointmentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            lifecycle: AppointmentLifecycleService::new(),
            clock,
        }
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(&self, id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        let appointment = self.store.get(id).await?;
        Self::ensure_can_view(&appointment, actor)?;
        Ok(appointment)
    }

    pub async fn list_appointments_for_patient(
        &self,
        patient_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if actor.user_id != patient_id && !actor.is_admin() {
            return Err(AppointmentError::Forbidden(
                "Not authorized to view appointments for this patient".to_string(),
            ));
        }
        self.store.list_by_patient(patient_id).await
    }

    pub async fn list_appointments_for_doctor(
        &self,
        doctor_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if actor.user_id != doctor_id && !actor.is_admin() {
            return Err(AppointmentError::Forbidden(
                "Not authorized to view appointments for this doctor".to_string(),
            ));
        }
        self.store.list_by_doctor(doctor_id).await
    }

    pub async fn appointment_history(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<StatusTransition>, AppointmentError> {
        self.get_appointment(id, actor).await?;
        self.store.transitions(id).await
    }

    pub fn status_table(&self) -> Vec<StatusDescriptor> {
        status_table(&self.lifecycle)
    }

    // ==========================================================================
    // COMMANDS
    // ==========================================================================

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let initial_status = self.lifecycle.initial_status(&request, actor)?;
        let appointment = self.store.create(request, initial_status).await?;

        info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.patient_id,
            doctor_id = %appointment.doctor_id,
            status = %appointment.status,
            "Appointment created"
        );
        Ok(appointment)
    }

    pub async fn book_appointment(&self, id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(id, actor, AppointmentAction::Book, None).await
    }

    pub async fn accept_appointment(&self, id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(id, actor, AppointmentAction::Accept, None).await
    }

    pub async fn reject_appointment(&self, id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(id, actor, AppointmentAction::Reject, None).await
    }

    pub async fn reschedule_appointment(
        &self,
        id: Uuid,
        new_time: DateTime<Utc>,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(id, actor, AppointmentAction::Reschedule, Some(new_time)).await
    }

    pub async fn cancel_appointment(&self, id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(id, actor, AppointmentAction::Cancel, None).await
    }

    pub async fn complete_appointment(&self, id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(id, actor, AppointmentAction::Complete, None).await
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_appointment(&self, id: Uuid, actor: &Actor) -> Result<(), AppointmentError> {
        if !actor.is_admin() {
            return Err(AppointmentError::Forbidden(
                "Only administrators can delete appointments".to_string(),
            ));
        }
        self.store.delete(id).await?;
        info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }

    #[instrument(skip(self, actor), fields(actor = %actor.user_id, role = ?actor.role))]
    async fn transition(
        &self,
        id: Uuid,
        actor: &Actor,
        action: AppointmentAction,
        new_time: Option<DateTime<Utc>>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.store.get(id).await?;
        let patch = self
            .lifecycle
            .plan_transition(action, &current, actor, self.clock.now(), new_time)?;

        debug!("Committing {} on appointment {} at version {}", action, id, current.version);
        let updated = self.store.update(id, patch).await?;

        info!(
            appointment_id = %id,
            actor_id = %actor.user_id,
            from = %current.status,
            to = %updated.status,
            "AUDIT: appointment {}",
            action
        );
        Ok(updated)
    }

    fn ensure_can_view(appointment: &Appointment, actor: &Actor) -> Result<(), AppointmentError> {
        if actor.is_party_to(appointment) || actor.is_admin() {
            Ok(())
        } else {
            Err(AppointmentError::Forbidden(
                "Not authorized to view this appointment".to_string(),
            ))
        }
    }
}
