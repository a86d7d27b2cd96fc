// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{AppJson, AppPath};

use crate::models::{
    Actor, Appointment, AppointmentError, AppointmentView, CreateAppointmentRequest,
    RescheduleAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::IllegalTransition { .. } => AppError::Conflict(message),
            AppointmentError::TooEarly { .. } => AppError::UnprocessableEntity(message),
            AppointmentError::Conflict => AppError::Conflict(message),
        }
    }
}

fn actor_of(user: &User) -> Result<Actor, AppError> {
    Actor::try_from(user).map_err(|_| AppError::Auth("Invalid user id in token".to_string()))
}

fn views(appointments: Vec<Appointment>) -> Vec<AppointmentView> {
    appointments.into_iter().map(AppointmentView::from).collect()
}

fn command_response(appointment: Appointment, message: &str) -> Json<Value> {
    Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment),
        "message": message
    }))
}

// ==============================================================================
// APPOINTMENT QUERIES
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = service.get_appointment(appointment_id, &actor).await?;

    Ok(Json(json!(AppointmentView::from(appointment))))
}

#[axum::debug_handler]
pub async fn get_appointment_history(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let transitions = service.appointment_history(appointment_id, &actor).await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "transitions": transitions
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(patient_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointments = service.list_appointments_for_patient(patient_id, &actor).await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "total": appointments.len(),
        "appointments": views(appointments)
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(doctor_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointments = service.list_appointments_for_doctor(doctor_id, &actor).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "total": appointments.len(),
        "appointments": views(appointments)
    })))
}

#[axum::debug_handler]
pub async fn get_status_table(State(service): State<Arc<AppointmentBookingService>>) -> Json<Value> {
    Json(json!({ "statuses": service.status_table() }))
}

// ==============================================================================
// APPOINTMENT COMMANDS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let actor = actor_of(&user)?;
    let appointment = service.create_appointment(request, &actor).await?;

    Ok((
        StatusCode::CREATED,
        command_response(appointment, "Appointment requested successfully"),
    ))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = service.book_appointment(appointment_id, &actor).await?;
    Ok(command_response(appointment, "Appointment booked"))
}

#[axum::debug_handler]
pub async fn accept_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = service.accept_appointment(appointment_id, &actor).await?;
    Ok(command_response(appointment, "Appointment accepted"))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = service.reject_appointment(appointment_id, &actor).await?;
    Ok(command_response(appointment, "Appointment rejected"))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
    AppJson(request): AppJson<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = service
        .reschedule_appointment(appointment_id, request.new_time, &actor)
        .await?;
    Ok(command_response(appointment, "Appointment rescheduled successfully"))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = service.cancel_appointment(appointment_id, &actor).await?;
    Ok(command_response(appointment, "Appointment cancelled successfully"))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = service.complete_appointment(appointment_id, &actor).await?;
    Ok(command_response(appointment, "Appointment completed"))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    AppPath(appointment_id): AppPath<Uuid>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    let actor = actor_of(&user)?;
    service.delete_appointment(appointment_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
