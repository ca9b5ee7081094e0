// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use salon_cell::models::RuleViolation;
use shared_models::StoreError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// One (service, duration, prep-time) triple inside an appointment's
/// service list. The first item of a booking always carries
/// `prep_minutes = 0`; legacy single-service bookings have exactly one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentLineItem {
    pub service_id: Uuid,
    pub duration_minutes: i32,
    pub prep_minutes: i32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub salon_id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub items: Vec<AppointmentLineItem>,
    pub start_time: DateTime<Utc>,
    /// Derived from the line items and stored:
    /// `start + Σduration + Σ(prep of all but the first item)`.
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub charged_amount: f64,
    /// Opaque token for unauthenticated confirm/cancel links.
    pub confirmation_token: String,
    pub cancellation_reason: Option<String>,
    pub reminder_24h_sent: bool,
    pub reminder_2h_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn total_duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Active statuses occupy the professional's calendar.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending
                | AppointmentStatus::Confirmed
                | AppointmentStatus::InProgress
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub salon_id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    /// Ordered; services are performed back-to-back.
    pub service_ids: Vec<Uuid>,
    pub start_time: DateTime<Utc>,
    /// Buffer inserted before every service after the first. Defaults to 0.
    pub prep_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
    /// Hand the appointment to a different professional at the same salon.
    pub new_professional_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
    pub cancelled_by: CancelledBy,
}

/// Who initiated the cancellation. Only client-initiated cancellations are
/// held to the salon's minimum-notice window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Client,
    Professional,
    System,
}

// ==============================================================================
// DURATION CALCULATION MODELS
// ==============================================================================

/// The computed time extent and price of a requested service list.
#[derive(Debug, Clone)]
pub struct AppointmentExtent {
    pub end_time: DateTime<Utc>,
    pub total_minutes: i64,
    pub charged_amount: f64,
    pub items: Vec<AppointmentLineItem>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    // --- validation (client-correctable) -------------------------------------
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("Client is blocked from booking at this salon")]
    ClientBlocked,

    #[error("Client belongs to a different salon")]
    ClientSalonMismatch,

    #[error("Service {service_id} belongs to a different salon")]
    ServiceSalonMismatch { service_id: Uuid },

    #[error("Service {service_id} is no longer offered")]
    ServiceInactive { service_id: Uuid },

    #[error("Professional does not perform service {service_id}")]
    ServiceNotOffered { service_id: Uuid },

    #[error("Requested time overlaps an existing appointment")]
    DoubleBooking,

    #[error("Requested time falls in a blocked period for the professional")]
    BlockedPeriod,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Cancellation requires at least {required_hours}h notice (deadline was {deadline})")]
    CancellationNoticeTooShort {
        required_hours: i64,
        deadline: DateTime<Utc>,
    },

    // --- not found ------------------------------------------------------------
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Salon not found")]
    SalonNotFound,

    #[error("Professional not found")]
    ProfessionalNotFound,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Confirmation token does not resolve to an appointment")]
    TokenNotFound,

    // --- transient ------------------------------------------------------------
    #[error("Appointment write conflicted with a concurrent booking")]
    WriteConflict,

    // --- programmer errors ----------------------------------------------------
    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    // --- infrastructure --------------------------------------------------------
    #[error("Database error: {0}")]
    Database(String),
}

impl SchedulingError {
    /// True for client-correctable business-rule rejections.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SchedulingError::Rule(_)
                | SchedulingError::ClientBlocked
                | SchedulingError::ClientSalonMismatch
                | SchedulingError::ServiceSalonMismatch { .. }
                | SchedulingError::ServiceInactive { .. }
                | SchedulingError::ServiceNotOffered { .. }
                | SchedulingError::DoubleBooking
                | SchedulingError::BlockedPeriod
                | SchedulingError::InvalidStatusTransition(_)
                | SchedulingError::CancellationNoticeTooShort { .. }
        )
    }
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WriteConflict => SchedulingError::WriteConflict,
            StoreError::NotFound(what) => SchedulingError::Database(format!("missing: {what}")),
            StoreError::Unavailable(msg) => SchedulingError::Database(msg),
        }
    }
}

// ==============================================================================
// SLOT SUGGESTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestedSlot {
    pub professional_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
