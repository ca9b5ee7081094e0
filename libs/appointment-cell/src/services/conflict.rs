// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use salon_cell::models::Salon;
use salon_cell::store::{TimeBlockStore, WorkingHoursStore};

use crate::models::{SchedulingError, SuggestedSlot};
use crate::store::AppointmentStore;

/// Detects collisions between a candidate window and a professional's
/// existing commitments: active appointments and time blocks. Both tests
/// use half-open interval overlap.
pub struct ConflictDetectionService {
    appointments: Arc<dyn AppointmentStore>,
    working_hours: Arc<dyn WorkingHoursStore>,
    time_blocks: Arc<dyn TimeBlockStore>,
}

impl ConflictDetectionService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        working_hours: Arc<dyn WorkingHoursStore>,
        time_blocks: Arc<dyn TimeBlockStore>,
    ) -> Self {
        Self {
            appointments,
            working_hours,
            time_blocks,
        }
    }

    /// Check `[start, end)` for the professional. `exclude` skips the
    /// appointment being rescheduled so it cannot conflict with itself.
    ///
    /// Callers must hold the per-professional booking lock across this
    /// check and the subsequent persist; without it two concurrent requests
    /// can both pass here before either saves.
    pub async fn check_window(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Checking conflicts for professional {} from {} to {}",
            professional_id, start, end
        );

        let existing = self
            .appointments
            .find_conflicting(professional_id, start, end)
            .await?;

        let double_booked = existing.iter().any(|appointment| {
            appointment.status.is_active()
                && Some(appointment.id) != exclude
                && overlaps(start, end, appointment.start_time, appointment.end_time)
        });
        if double_booked {
            warn!(
                "Double booking rejected for professional {} at {}",
                professional_id, start
            );
            return Err(SchedulingError::DoubleBooking);
        }

        let blocks = self
            .time_blocks
            .find_conflicting(professional_id, start, end)
            .await?;
        if blocks.iter().any(|block| block.covers(start, end)) {
            warn!(
                "Blocked period rejected for professional {} at {}",
                professional_id, start
            );
            return Err(SchedulingError::BlockedPeriod);
        }

        Ok(())
    }

    /// Scan forward from `preferred_start` in `salon.booking_interval_minutes`
    /// steps for the first window inside salon opening hours and the
    /// professional's working hours (break excluded) that neither collides
    /// with an active appointment nor with a time block. Lead time remains
    /// the caller's concern.
    pub async fn find_next_available_slot(
        &self,
        professional_id: Uuid,
        salon: &Salon,
        preferred_start: DateTime<Utc>,
        duration_minutes: i64,
        max_search_days: i64,
    ) -> Result<Option<SuggestedSlot>, SchedulingError> {
        let step = Duration::minutes(salon.booking_interval_minutes.max(1) as i64);
        let duration = Duration::minutes(duration_minutes);

        for day_offset in 0..max_search_days {
            let day = (preferred_start + Duration::days(day_offset)).date_naive();
            let booked = self
                .appointments
                .find_by_professional_and_day(professional_id, day)
                .await?;
            let hours = self
                .working_hours
                .find(professional_id, day.weekday())
                .await?
                .filter(|h| h.active);

            let mut candidate = if day_offset == 0 {
                preferred_start
            } else {
                day.and_time(salon.opens_at).and_utc()
            };
            let day_close = day.and_time(salon.closes_at).and_utc();

            while candidate + duration <= day_close {
                let candidate_end = candidate + duration;
                let within_schedule = candidate.time() >= salon.opens_at
                    && hours.as_ref().map_or(true, |h| {
                        candidate.time() >= h.start_time
                            && candidate_end.time() <= h.end_time
                            && !(h.has_break()
                                && candidate.time() < h.break_end
                                && candidate_end.time() > h.break_start)
                    });
                if within_schedule {
                    let taken = booked.iter().any(|appointment| {
                        appointment.status.is_active()
                            && overlaps(
                                candidate,
                                candidate_end,
                                appointment.start_time,
                                appointment.end_time,
                            )
                    });
                    if !taken {
                        let blocks = self
                            .time_blocks
                            .find_conflicting(professional_id, candidate, candidate_end)
                            .await?;
                        if !blocks.iter().any(|b| b.covers(candidate, candidate_end)) {
                            return Ok(Some(SuggestedSlot {
                                professional_id,
                                start_time: candidate,
                                end_time: candidate_end,
                            }));
                        }
                    }
                }
                candidate += step;
            }
        }

        Ok(None)
    }
}

/// Half-open overlap: `[a_start, a_end)` intersects `[b_start, b_end)`.
fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}
