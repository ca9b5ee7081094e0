// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use salon_cell::models::{Client, Professional, Salon, Service};
use salon_cell::services::schedule_rules::ScheduleRuleService;
use salon_cell::store::{CatalogStore, ClientStore, WorkingHoursStore};
use shared_config::EngineConfig;
use shared_models::StoreError;
use shared_utils::token::confirmation_token;
use shared_utils::Clock;

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, RescheduleAppointmentRequest,
    SchedulingError, SuggestedSlot,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::duration::DurationService;
use crate::store::{AppointmentStore, Notifier};

/// The single entry point for "can this appointment be created or
/// rescheduled?". Composes the duration calculator, the calendar rule set
/// and the conflict detector, then persists under a per-professional lock.
pub struct BookingService {
    catalog: Arc<dyn CatalogStore>,
    working_hours: Arc<dyn WorkingHoursStore>,
    clients: Arc<dyn ClientStore>,
    appointments: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    rules: ScheduleRuleService,
    duration: DurationService,
    conflicts: ConflictDetectionService,
    config: EngineConfig,
    /// One async mutex per professional. Held across the conflict check and
    /// the save: a check-then-act race here is a double booking.
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl BookingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        working_hours: Arc<dyn WorkingHoursStore>,
        clients: Arc<dyn ClientStore>,
        appointments: Arc<dyn AppointmentStore>,
        time_blocks: Arc<dyn salon_cell::store::TimeBlockStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let conflicts = ConflictDetectionService::new(
            Arc::clone(&appointments),
            Arc::clone(&working_hours),
            time_blocks,
        );
        Self {
            catalog,
            working_hours,
            clients,
            appointments,
            notifier,
            clock,
            rules: ScheduleRuleService::new(),
            duration: DurationService::new(),
            conflicts,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// First bookable window at or after `preferred_start`, scanning as many
    /// days ahead as the engine is configured to search. Offered to callers
    /// when a booking was rejected for a calendar conflict.
    pub async fn suggest_alternative(
        &self,
        professional_id: Uuid,
        preferred_start: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<Option<SuggestedSlot>, SchedulingError> {
        let professional = self
            .catalog
            .professional(professional_id)
            .await?
            .ok_or(SchedulingError::ProfessionalNotFound)?;
        let salon = self
            .catalog
            .salon(professional.salon_id)
            .await?
            .ok_or(SchedulingError::SalonNotFound)?;

        self.conflicts
            .find_next_available_slot(
                professional_id,
                &salon,
                preferred_start,
                duration_minutes,
                self.config.slot_search_days,
            )
            .await
    }

    /// Validate and persist a new appointment. On success the appointment
    /// is PENDING, carries a fresh confirmation token, and the client's
    /// appointment counter has been incremented.
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking request for client {} with professional {} at {}",
            request.client_id, request.professional_id, request.start_time
        );

        let lock = self.professional_lock(request.professional_id);
        let _guard = lock.lock().await;

        let (salon, professional, client) = self
            .resolve_parties(request.salon_id, request.professional_id, request.client_id)
            .await?;
        let services = self
            .resolve_services(&professional, &request.service_ids)
            .await?;

        let extent = self.duration.compute(
            salon.id,
            &services,
            request.prep_minutes.unwrap_or(0),
            request.start_time,
        )?;

        let now = self.clock.now();
        let hours = self
            .working_hours
            .find(professional.id, request.start_time.weekday())
            .await?;
        self.rules.check_window(
            &salon,
            &professional,
            hours.as_ref(),
            now,
            request.start_time,
            extent.end_time,
        )?;

        if client.blocked {
            warn!("Blocked client {} attempted to book", client.id);
            return Err(SchedulingError::ClientBlocked);
        }

        self.conflicts
            .check_window(professional.id, request.start_time, extent.end_time, None)
            .await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            salon_id: salon.id,
            client_id: client.id,
            professional_id: professional.id,
            items: extent.items,
            start_time: request.start_time,
            end_time: extent.end_time,
            status: AppointmentStatus::Pending,
            charged_amount: extent.charged_amount,
            confirmation_token: confirmation_token(),
            cancellation_reason: None,
            reminder_24h_sent: false,
            reminder_2h_sent: false,
            created_at: now,
            updated_at: now,
        };

        let saved = self.save_with_retry(appointment).await?;

        // The appointment is persisted and occupies the calendar; a counter
        // failure must not turn the booking into an error.
        if let Err(err) = self.clients.increment_appointment_count(client.id).await {
            warn!(
                "Failed to increment appointment counter for client {}: {err}",
                client.id
            );
        }

        // Best-effort, never blocks or fails the booking.
        let notifier = Arc::clone(&self.notifier);
        let notified = saved.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.confirmation_link(&notified).await {
                warn!(
                    "Confirmation notification failed for appointment {}: {err:#}",
                    notified.id
                );
            }
        });

        info!(
            "Appointment {} booked for professional {} ({} - {})",
            saved.id, saved.professional_id, saved.start_time, saved.end_time
        );
        Ok(saved)
    }

    /// Move a non-terminal appointment to a new time, optionally to a new
    /// professional. The full validation chain runs again for the target
    /// window; on success the appointment is forced back to PENDING and its
    /// reminder flags are cleared, so the client re-confirms.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Rescheduling appointment {}", appointment_id);

        let mut appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or(SchedulingError::AppointmentNotFound)?;

        if appointment.status.is_terminal() {
            return Err(SchedulingError::InvalidStatusTransition(appointment.status));
        }

        let professional_id = request
            .new_professional_id
            .unwrap_or(appointment.professional_id);

        let lock = self.professional_lock(professional_id);
        let _guard = lock.lock().await;

        let (salon, professional, client) = self
            .resolve_parties(appointment.salon_id, professional_id, appointment.client_id)
            .await?;

        // Line items are kept as booked; only the window (and possibly the
        // professional) moves.
        for item in &appointment.items {
            if !professional.offers_service(item.service_id) {
                return Err(SchedulingError::ServiceNotOffered {
                    service_id: item.service_id,
                });
            }
        }

        let total = appointment.end_time - appointment.start_time;
        let new_end = request.new_start_time + total;

        let now = self.clock.now();
        let hours = self
            .working_hours
            .find(professional.id, request.new_start_time.weekday())
            .await?;
        self.rules.check_window(
            &salon,
            &professional,
            hours.as_ref(),
            now,
            request.new_start_time,
            new_end,
        )?;

        if client.blocked {
            return Err(SchedulingError::ClientBlocked);
        }

        self.conflicts
            .check_window(
                professional.id,
                request.new_start_time,
                new_end,
                Some(appointment.id),
            )
            .await?;

        appointment.professional_id = professional.id;
        appointment.start_time = request.new_start_time;
        appointment.end_time = new_end;
        appointment.status = AppointmentStatus::Pending;
        appointment.reminder_24h_sent = false;
        appointment.reminder_2h_sent = false;
        appointment.updated_at = now;

        let saved = self.save_with_retry(appointment).await?;
        info!(
            "Appointment {} rescheduled to {} with professional {}",
            saved.id, saved.start_time, saved.professional_id
        );
        Ok(saved)
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn resolve_parties(
        &self,
        salon_id: Uuid,
        professional_id: Uuid,
        client_id: Uuid,
    ) -> Result<(Salon, Professional, Client), SchedulingError> {
        let salon = self
            .catalog
            .salon(salon_id)
            .await?
            .ok_or(SchedulingError::SalonNotFound)?;
        let professional = self
            .catalog
            .professional(professional_id)
            .await?
            .ok_or(SchedulingError::ProfessionalNotFound)?;
        let client = self
            .clients
            .get(client_id)
            .await?
            .ok_or(SchedulingError::ClientNotFound)?;

        if client.salon_id != salon.id {
            return Err(SchedulingError::ClientSalonMismatch);
        }

        Ok((salon, professional, client))
    }

    async fn resolve_services(
        &self,
        professional: &Professional,
        service_ids: &[Uuid],
    ) -> Result<Vec<Service>, SchedulingError> {
        if service_ids.is_empty() {
            return Err(SchedulingError::InvalidRequest(
                "service list must not be empty".to_string(),
            ));
        }

        let found = self.catalog.services_by_ids(service_ids).await?;
        let mut ordered = Vec::with_capacity(service_ids.len());
        for id in service_ids {
            let service = found
                .iter()
                .find(|s| s.id == *id)
                .cloned()
                .ok_or(SchedulingError::ServiceNotFound(*id))?;
            if !service.active {
                return Err(SchedulingError::ServiceInactive { service_id: *id });
            }
            if !professional.offers_service(*id) {
                return Err(SchedulingError::ServiceNotOffered { service_id: *id });
            }
            ordered.push(service);
        }
        Ok(ordered)
    }

    /// Persistence-layer write conflicts are transient; retry before
    /// surfacing them, per the engine configuration (default: once).
    async fn save_with_retry(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, SchedulingError> {
        let attempts = 1 + self.config.write_retry_attempts;
        let mut last_conflict = SchedulingError::WriteConflict;

        for attempt in 1..=attempts {
            match self.appointments.save(appointment.clone()).await {
                Ok(saved) => return Ok(saved),
                Err(StoreError::WriteConflict) => {
                    warn!(
                        "Write conflict saving appointment {} (attempt {}/{})",
                        appointment.id, attempt, attempts
                    );
                    last_conflict = SchedulingError::WriteConflict;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(last_conflict)
    }

    fn professional_lock(&self, professional_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("professional lock map poisoned");
        Arc::clone(
            locks
                .entry(professional_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}
