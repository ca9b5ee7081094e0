// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use salon_cell::store::{CatalogStore, ClientStore};
use shared_utils::Clock;

use crate::models::{
    Appointment, AppointmentStatus, CancelAppointmentRequest, CancelledBy, SchedulingError,
};
use crate::store::{AppointmentStore, Notifier};

/// Which reminder notifications are due for an appointment. Consumed by an
/// out-of-scope sweeper; the engine only tracks the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueReminders {
    pub day_before: bool,
    pub two_hours_before: bool,
}

/// The appointment state machine. Every status change flows through here;
/// appointments are never mutated elsewhere (rescheduling, which re-runs
/// booking validation, lives in the booking service).
pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    catalog: Arc<dyn CatalogStore>,
    clients: Arc<dyn ClientStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycleService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        catalog: Arc<dyn CatalogStore>,
        clients: Arc<dyn ClientStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            catalog,
            clients,
            notifier,
            clock,
        }
    }

    /// All statuses reachable from `current`.
    pub fn valid_transitions(&self, current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::InProgress => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states admit nothing.
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => vec![],
        }
    }

    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        if self.valid_transitions(current).contains(&next) {
            Ok(())
        } else {
            warn!("Invalid status transition attempted: {current} -> {next}");
            Err(SchedulingError::InvalidStatusTransition(current))
        }
    }

    pub async fn confirm(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.get(appointment_id).await?;
        self.transition(appointment, AppointmentStatus::Confirmed)
            .await
    }

    pub async fn start(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.get(appointment_id).await?;
        self.transition(appointment, AppointmentStatus::InProgress)
            .await
    }

    /// Completion triggers payment/review flows in surrounding systems;
    /// here it is only the terminal status write.
    pub async fn complete(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.get(appointment_id).await?;
        self.transition(appointment, AppointmentStatus::Completed)
            .await
    }

    /// Cancel from any non-terminal status. Client-initiated cancellations
    /// must respect the salon's minimum notice; professional- and
    /// system-initiated ones bypass it.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.get(appointment_id).await?;
        self.cancel_appointment(appointment, request).await
    }

    /// Mark a confirmed appointment as a no-show and apply the client
    /// penalty: the counter increment is transactional increment-and-read,
    /// and reaching the salon's limit blocks the client. The penalty is
    /// applied before the terminal status write; if it fails the appointment
    /// stays CONFIRMED and the sweep can retry.
    pub async fn mark_no_show(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.get(appointment_id).await?;
        self.validate_transition(appointment.status, AppointmentStatus::NoShow)?;

        let salon = self
            .catalog
            .salon(appointment.salon_id)
            .await?
            .ok_or(SchedulingError::SalonNotFound)?;

        let no_show_count = self.clients.increment_no_show(appointment.client_id).await?;
        if no_show_count >= salon.max_no_shows {
            info!(
                "Client {} reached {} no-shows, blocking",
                appointment.client_id, no_show_count
            );
            self.clients.set_blocked(appointment.client_id, true).await?;
        }

        self.write_status(appointment, AppointmentStatus::NoShow)
            .await
    }

    // ==========================================================================
    // TOKEN-ADDRESSED OPERATIONS (unauthenticated confirm/cancel links)
    // ==========================================================================

    pub async fn confirm_by_token(&self, token: &str) -> Result<Appointment, SchedulingError> {
        let appointment = self.get_by_token(token).await?;
        self.transition(appointment, AppointmentStatus::Confirmed)
            .await
    }

    /// Token cancellation is always client-initiated, so the notice window
    /// applies.
    pub async fn cancel_by_token(
        &self,
        token: &str,
        reason: String,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.get_by_token(token).await?;
        self.cancel_appointment(
            appointment,
            CancelAppointmentRequest {
                reason,
                cancelled_by: CancelledBy::Client,
            },
        )
        .await
    }

    // ==========================================================================
    // SWEEP HELPERS
    // ==========================================================================

    /// A confirmed appointment 30 minutes past its start with nobody showing
    /// up is eligible for the no-show transition.
    pub fn should_mark_no_show(&self, appointment: &Appointment, now: DateTime<Utc>) -> bool {
        appointment.status == AppointmentStatus::Confirmed
            && now > appointment.start_time + Duration::minutes(30)
    }

    /// Which reminders are due and unsent for an upcoming appointment.
    pub fn due_reminders(&self, appointment: &Appointment, now: DateTime<Utc>) -> DueReminders {
        let upcoming = matches!(
            appointment.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        ) && now < appointment.start_time;

        DueReminders {
            day_before: upcoming
                && !appointment.reminder_24h_sent
                && now >= appointment.start_time - Duration::hours(24),
            two_hours_before: upcoming
                && !appointment.reminder_2h_sent
                && now >= appointment.start_time - Duration::hours(2),
        }
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn get(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or(SchedulingError::AppointmentNotFound)
    }

    async fn get_by_token(&self, token: &str) -> Result<Appointment, SchedulingError> {
        self.appointments
            .find_by_token(token)
            .await?
            .ok_or(SchedulingError::TokenNotFound)
    }

    async fn cancel_appointment(
        &self,
        appointment: Appointment,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        self.validate_transition(appointment.status, AppointmentStatus::Cancelled)?;

        if request.cancelled_by == CancelledBy::Client {
            let salon = self
                .catalog
                .salon(appointment.salon_id)
                .await?
                .ok_or(SchedulingError::SalonNotFound)?;
            let deadline = appointment.start_time - Duration::hours(salon.min_cancel_hours);
            if self.clock.now() > deadline {
                return Err(SchedulingError::CancellationNoticeTooShort {
                    required_hours: salon.min_cancel_hours,
                    deadline,
                });
            }
        }

        let mut cancelled = appointment;
        cancelled.cancellation_reason = Some(request.reason.clone());
        let cancelled = self
            .write_status(cancelled, AppointmentStatus::Cancelled)
            .await?;

        // Best-effort notification; a failure never unwinds the transition.
        let notifier = Arc::clone(&self.notifier);
        let notified = cancelled.clone();
        let reason = request.reason;
        tokio::spawn(async move {
            if let Err(err) = notifier.cancellation(&notified, &reason).await {
                warn!(
                    "Cancellation notification failed for appointment {}: {err:#}",
                    notified.id
                );
            }
        });

        Ok(cancelled)
    }

    async fn transition(
        &self,
        appointment: Appointment,
        next: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        self.validate_transition(appointment.status, next)?;
        self.write_status(appointment, next).await
    }

    async fn write_status(
        &self,
        mut appointment: Appointment,
        next: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Appointment {} transition {} -> {}",
            appointment.id, appointment.status, next
        );
        appointment.status = next;
        appointment.updated_at = self.clock.now();
        let saved = self.appointments.save(appointment).await?;
        info!("Appointment {} is now {}", saved.id, saved.status);
        Ok(saved)
    }
}
