// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::auth::User;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Booked,
    // "confirmed" was used interchangeably with "accepted" by older clients
    #[serde(alias = "confirmed")]
    Accepted,
    Rejected,
    Rescheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Booked,
        AppointmentStatus::Accepted,
        AppointmentStatus::Rejected,
        AppointmentStatus::Rescheduled,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected | AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands that move an appointment between statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Book,
    Accept,
    Reject,
    Reschedule,
    Cancel,
    Complete,
}

impl AppointmentAction {
    pub const ALL: [AppointmentAction; 6] = [
        AppointmentAction::Book,
        AppointmentAction::Accept,
        AppointmentAction::Reject,
        AppointmentAction::Reschedule,
        AppointmentAction::Cancel,
        AppointmentAction::Complete,
    ];

    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            AppointmentAction::Book => AppointmentStatus::Booked,
            AppointmentAction::Accept => AppointmentStatus::Accepted,
            AppointmentAction::Reject => AppointmentStatus::Rejected,
            AppointmentAction::Reschedule => AppointmentStatus::Rescheduled,
            AppointmentAction::Cancel => AppointmentStatus::Cancelled,
            AppointmentAction::Complete => AppointmentStatus::Completed,
        }
    }
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentAction::Book => "book",
            AppointmentAction::Accept => "accept",
            AppointmentAction::Reject => "reject",
            AppointmentAction::Reschedule => "reschedule",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub at: DateTime<Utc>,
}

// ==============================================================================
// ACTORS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Patient,
    Doctor,
    Admin,
}

impl ActorRole {
    /// Unknown or missing roles fall back to the least privileged one.
    pub fn from_claim(role: Option<&str>) -> Self {
        match role {
            Some("doctor") => ActorRole::Doctor,
            Some("admin") => ActorRole::Admin,
            _ => ActorRole::Patient,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: ActorRole) -> Self {
        Self { user_id, role }
    }

    pub fn patient(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Patient)
    }

    pub fn doctor(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Doctor)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    pub fn is_assigned_doctor(&self, appointment: &Appointment) -> bool {
        self.role == ActorRole::Doctor && self.user_id == appointment.doctor_id
    }

    pub fn is_party_to(&self, appointment: &Appointment) -> bool {
        appointment.involves(self.user_id)
    }
}

impl TryFrom<&User> for Actor {
    type Error = AppointmentError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppointmentError::Forbidden("Caller id is not a valid UUID".to_string()))?;
        Ok(Actor::new(user_id, ActorRole::from_claim(user.role.as_deref())))
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
}

/// Partial update applied by the store. Fields left `None` are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusPresentation {
    pub label: &'static str,
    pub color_token: &'static str,
}

/// Appointment as rendered by dashboards: the record plus its display data.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub presentation: StatusPresentation,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusDescriptor {
    pub status: AppointmentStatus,
    pub label: &'static str,
    pub color_token: &'static str,
    pub terminal: bool,
    pub next: Vec<AppointmentStatus>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot {action} an appointment that is {from}")]
    IllegalTransition {
        from: AppointmentStatus,
        action: AppointmentAction,
    },

    #[error("Appointment cannot be completed before {scheduled_at}")]
    TooEarly { scheduled_at: DateTime<Utc> },

    #[error("Appointment was modified concurrently, re-fetch and retry")]
    Conflict,
}
