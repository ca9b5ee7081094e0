// libs/appointment-cell/src/store.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use shared_models::StoreError;

use crate::models::Appointment;

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Insert or update. May fail with `StoreError::WriteConflict` when a
    /// concurrent writer touched the same row; callers retry once.
    async fn save(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Appointment>, StoreError>;

    /// Appointments for the professional whose `[start, end)` overlaps the
    /// given range, regardless of status. Status filtering happens in the
    /// conflict detector.
    async fn find_conflicting(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn find_by_professional_and_day(
        &self,
        professional_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;
}

/// Outbound notification dispatch. Invoked fire-and-forget after state
/// transitions; a failure here is logged and swallowed, never rolled back
/// into the transition that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn confirmation_link(&self, appointment: &Appointment) -> anyhow::Result<()>;

    async fn cancellation(&self, appointment: &Appointment, reason: &str) -> anyhow::Result<()>;
}
