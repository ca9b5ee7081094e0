// libs/salon-cell/src/models.rs
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// SALON AND STAFF MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salon {
    pub id: Uuid,
    pub name: String,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    /// Minimum notice between "now" and a new appointment's start.
    pub min_lead_hours: i64,
    /// Minimum notice before an appointment's start to permit cancellation.
    pub min_cancel_hours: i64,
    /// No-show count at which a client is blocked from booking.
    pub max_no_shows: i32,
    /// Slot granularity used when suggesting alternative times.
    pub booking_interval_minutes: i32,
    pub accepts_online_booking: bool,
    /// Soft-delete flag. Salons are deactivated, never deleted.
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: Uuid,
    pub salon_id: Uuid,
    pub name: String,
    pub accepts_online_booking: bool,
    /// Services this professional performs.
    pub service_ids: Vec<Uuid>,
}

impl Professional {
    pub fn offers_service(&self, service_id: Uuid) -> bool {
        self.service_ids.contains(&service_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub salon_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub salon_id: Uuid,
    pub name: String,
    pub total_appointments: i32,
    pub no_show_count: i32,
    /// Set when `no_show_count` reaches `Salon::max_no_shows`.
    pub blocked: bool,
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// A professional's recurring weekly availability window with an optional
/// break. At most one record exists per (professional, weekday); the store
/// enforces the uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub professional_id: Uuid,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// `break_start == break_end` means no break.
    pub break_start: NaiveTime,
    pub break_end: NaiveTime,
    pub active: bool,
}

impl WorkingHours {
    /// Structural invariants: start < end, break_start <= break_end,
    /// break contained in [start, end].
    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
            && self.break_start <= self.break_end
            && self.break_start >= self.start_time
            && self.break_end <= self.end_time
    }

    pub fn has_break(&self) -> bool {
        self.break_start < self.break_end
    }
}

/// Ad-hoc unavailability window for a professional (vacation, personal
/// time). Overlapping blocks are not merged; each is honored independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reason: Option<String>,
    /// A recurring block repeats weekly on its start weekday.
    pub recurring: bool,
}

impl TimeBlock {
    /// Does this block make `[start, end)` unavailable?
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if self.recurring {
            // Weekly repetition: same weekday, overlapping time-of-day.
            use chrono::Datelike;
            if start.weekday() != self.start.weekday() {
                return false;
            }
            start.time() < self.end.time() && end.time() > self.start.time()
        } else {
            self.start < end && start < self.end
        }
    }
}

// ==============================================================================
// CALENDAR RULE VIOLATIONS
// ==============================================================================

/// Reason codes produced by the calendar rule set. These are expected
/// business outcomes, not failures; each carries the bounds it was checked
/// against so callers can render a precise message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("Salon is deactivated")]
    SalonInactive,

    #[error("Salon does not accept online booking")]
    SalonBookingDisabled,

    #[error("Professional does not accept online booking")]
    ProfessionalBookingDisabled,

    #[error("Professional does not belong to this salon")]
    ProfessionalSalonMismatch,

    #[error("Booking requires at least {required_hours}h notice (earliest start {earliest})")]
    LeadTimeTooShort {
        required_hours: i64,
        earliest: DateTime<Utc>,
    },

    #[error("Requested time is outside business hours ({opens_at}-{closes_at})")]
    OutsideBusinessHours {
        opens_at: NaiveTime,
        closes_at: NaiveTime,
    },

    #[error("Requested time is outside the professional's working hours ({start_time}-{end_time})")]
    OutsideWorkingHours {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },

    #[error("Requested time overlaps the professional's break ({break_start}-{break_end})")]
    BreakOverlap {
        break_start: NaiveTime,
        break_end: NaiveTime,
    },
}
