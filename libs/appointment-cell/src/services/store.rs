// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::DEFAULT_MAX_REASON_LENGTH;

use crate::models::{
    Appointment, AppointmentError, AppointmentPatch, AppointmentStatus, CreateAppointmentRequest,
    StatusTransition,
};
use crate::services::clock::Clock;

/// Id → appointment mapping. Implementations validate input shape on create but
/// never judge whether a status change is legal.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(
        &self,
        request: CreateAppointmentRequest,
        initial_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError>;

    /// Most recent `scheduled_at` first.
    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    /// Earliest `scheduled_at` first.
    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    async fn update(&self, id: Uuid, patch: AppointmentPatch) -> Result<Appointment, AppointmentError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError>;

    async fn transitions(&self, id: Uuid) -> Result<Vec<StatusTransition>, AppointmentError>;
}

/// Shape and timing checks applied to every new appointment.
pub fn validate_new_appointment(
    request: &CreateAppointmentRequest,
    initial_status: AppointmentStatus,
    now: DateTime<Utc>,
    max_reason_length: usize,
) -> Result<(Uuid, Uuid), AppointmentError> {
    let patient_id = request
        .patient_id
        .filter(|id| !id.is_nil())
        .ok_or_else(|| AppointmentError::ValidationError("patient_id is required".to_string()))?;
    let doctor_id = request
        .doctor_id
        .filter(|id| !id.is_nil())
        .ok_or_else(|| AppointmentError::ValidationError("doctor_id is required".to_string()))?;

    if patient_id == doctor_id {
        return Err(AppointmentError::ValidationError(
            "patient and doctor must be different people".to_string(),
        ));
    }

    if request.scheduled_at <= now {
        return Err(AppointmentError::ValidationError(
            "Appointment must be scheduled for a future time".to_string(),
        ));
    }

    if request.reason.chars().count() > max_reason_length {
        return Err(AppointmentError::ValidationError(format!(
            "reason must be at most {} characters",
            max_reason_length
        )));
    }

    if !matches!(initial_status, AppointmentStatus::Pending | AppointmentStatus::Booked) {
        return Err(AppointmentError::ValidationError(format!(
            "appointments cannot be created as {}",
            initial_status
        )));
    }

    Ok((patient_id, doctor_id))
}

#[derive(Debug, Clone)]
struct StoredAppointment {
    appointment: Appointment,
    transitions: Vec<StatusTransition>,
}

pub struct InMemoryAppointmentStore {
    records: RwLock<HashMap<Uuid, StoredAppointment>>,
    clock: Arc<dyn Clock>,
    max_reason_length: usize,
}

impl InMemoryAppointmentStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
            max_reason_length: DEFAULT_MAX_REASON_LENGTH,
        }
    }

    pub fn with_max_reason_length(mut self, max_reason_length: usize) -> Self {
        self.max_reason_length = max_reason_length;
        self
    }

    async fn collect_where<F>(&self, filter: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        self.records
            .read()
            .await
            .values()
            .map(|stored| &stored.appointment)
            .filter(|appointment| filter(*appointment))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(
        &self,
        request: CreateAppointmentRequest,
        initial_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let now = self.clock.now();
        let (patient_id, doctor_id) =
            validate_new_appointment(&request, initial_status, now, self.max_reason_length)?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            scheduled_at: request.scheduled_at,
            reason: request.reason,
            status: initial_status,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        self.records.write().await.insert(
            appointment.id,
            StoredAppointment {
                appointment: appointment.clone(),
                transitions: Vec::new(),
            },
        );

        debug!("Stored appointment {} as {}", appointment.id, appointment.status);
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.records
            .read()
            .await
            .get(&id)
            .map(|stored| stored.appointment.clone())
            .ok_or(AppointmentError::NotFound)
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self.collect_where(|a| a.patient_id == patient_id).await;
        appointments.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at).then(a.id.cmp(&b.id)));
        Ok(appointments)
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self.collect_where(|a| a.doctor_id == doctor_id).await;
        appointments.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
        Ok(appointments)
    }

    async fn update(&self, id: Uuid, patch: AppointmentPatch) -> Result<Appointment, AppointmentError> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let stored = records.get_mut(&id).ok_or(AppointmentError::NotFound)?;

        if let Some(expected) = patch.expected_version {
            if expected != stored.appointment.version {
                warn!(
                    appointment_id = %id,
                    expected,
                    actual = stored.appointment.version,
                    "Rejected stale appointment update"
                );
                return Err(AppointmentError::Conflict);
            }
        }

        let appointment = &mut stored.appointment;

        if let Some(status) = patch.status {
            stored.transitions.push(StatusTransition {
                from: appointment.status,
                to: status,
                at: now,
            });
            appointment.status = status;
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            appointment.scheduled_at = scheduled_at;
        }
        if let Some(reason) = patch.reason {
            appointment.reason = reason;
        }

        appointment.version += 1;
        appointment.updated_at = now;

        Ok(appointment.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AppointmentError::NotFound)
    }

    async fn transitions(&self, id: Uuid) -> Result<Vec<StatusTransition>, AppointmentError> {
        self.records
            .read()
            .await
            .get(&id)
            .map(|stored| stored.transitions.clone())
            .ok_or(AppointmentError::NotFound)
    }
}
