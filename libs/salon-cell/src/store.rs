// libs/salon-cell/src/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use uuid::Uuid;

use shared_models::StoreError;

use crate::models::{Client, Professional, Salon, Service, TimeBlock, WorkingHours};

/// Read-side lookups for the records a booking request references.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn salon(&self, id: Uuid) -> Result<Option<Salon>, StoreError>;

    async fn professional(&self, id: Uuid) -> Result<Option<Professional>, StoreError>;

    /// Resolve services preserving the requested order. A missing id is
    /// reported by returning fewer services than ids; callers match up by id.
    async fn services_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Service>, StoreError>;
}

#[async_trait]
pub trait WorkingHoursStore: Send + Sync {
    /// The single WorkingHours row for (professional, weekday), if any.
    async fn find(
        &self,
        professional_id: Uuid,
        weekday: Weekday,
    ) -> Result<Option<WorkingHours>, StoreError>;
}

#[async_trait]
pub trait TimeBlockStore: Send + Sync {
    /// All blocks for the professional that make `[start, end)` unavailable.
    async fn find_conflicting(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, StoreError>;
}

/// Client lookups plus the mutable counters. The increments are
/// increment-and-read so the "increment, compare to threshold, block"
/// sequence has no read-modify-write race.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Client>, StoreError>;

    /// Returns the new total.
    async fn increment_appointment_count(&self, id: Uuid) -> Result<i32, StoreError>;

    /// Returns the new no-show count.
    async fn increment_no_show(&self, id: Uuid) -> Result<i32, StoreError>;

    async fn set_blocked(&self, id: Uuid, blocked: bool) -> Result<(), StoreError>;
}
