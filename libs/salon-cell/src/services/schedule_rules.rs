// libs/salon-cell/src/services/schedule_rules.rs
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::models::{Professional, RuleViolation, Salon, WorkingHours};

/// The calendar rule set: answers whether an instant range is structurally
/// permissible for a professional at a salon, using only static
/// configuration. Existing bookings are the conflict detector's concern.
pub struct ScheduleRuleService;

impl ScheduleRuleService {
    pub fn new() -> Self {
        Self
    }

    /// Check `[start, end)` against every static constraint, failing fast
    /// with the first violated rule.
    ///
    /// `working_hours` is the row for (professional, weekday-of-start); a
    /// missing or inactive row means the professional has no day-of-week
    /// restriction.
    pub fn check_window(
        &self,
        salon: &Salon,
        professional: &Professional,
        working_hours: Option<&WorkingHours>,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), RuleViolation> {
        debug!(
            "Checking schedule rules for professional {} at salon {} from {} to {}",
            professional.id, salon.id, start, end
        );

        if !salon.active {
            return Err(RuleViolation::SalonInactive);
        }
        if !salon.accepts_online_booking {
            return Err(RuleViolation::SalonBookingDisabled);
        }
        if !professional.accepts_online_booking {
            return Err(RuleViolation::ProfessionalBookingDisabled);
        }
        if professional.salon_id != salon.id {
            warn!(
                "Professional {} booked against foreign salon {}",
                professional.id, salon.id
            );
            return Err(RuleViolation::ProfessionalSalonMismatch);
        }

        let earliest = now + Duration::hours(salon.min_lead_hours);
        if start < earliest {
            return Err(RuleViolation::LeadTimeTooShort {
                required_hours: salon.min_lead_hours,
                earliest,
            });
        }

        // Time-of-day containment cannot hold across calendar days.
        if end.date_naive() != start.date_naive() {
            return Err(RuleViolation::OutsideBusinessHours {
                opens_at: salon.opens_at,
                closes_at: salon.closes_at,
            });
        }

        let start_tod = start.time();
        let end_tod = end.time();

        if start_tod < salon.opens_at || end_tod > salon.closes_at {
            return Err(RuleViolation::OutsideBusinessHours {
                opens_at: salon.opens_at,
                closes_at: salon.closes_at,
            });
        }

        if let Some(hours) = working_hours.filter(|h| h.active) {
            if start_tod < hours.start_time || end_tod > hours.end_time {
                return Err(RuleViolation::OutsideWorkingHours {
                    start_time: hours.start_time,
                    end_time: hours.end_time,
                });
            }
            // Half-open overlap against the break window.
            if hours.has_break() && start_tod < hours.break_end && end_tod > hours.break_start {
                return Err(RuleViolation::BreakOverlap {
                    break_start: hours.break_start,
                    break_end: hours.break_end,
                });
            }
        }

        Ok(())
    }
}

impl Default for ScheduleRuleService {
    fn default() -> Self {
        Self::new()
    }
}
