mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentStatus, RescheduleAppointmentRequest, SchedulingError,
};
use appointment_cell::services::booking::BookingService;
use appointment_cell::store::AppointmentStore;
use salon_cell::models::{Client, RuleViolation, Service, TimeBlock};
use salon_cell::store::ClientStore;
use shared_config::EngineConfig;
use shared_database::MemoryStore;
use shared_models::StoreError;

use common::{monday, settle, test_env};

#[tokio::test]
async fn books_a_pending_appointment_with_token_and_counter() {
    let env = test_env().await;

    let appointment = env
        .booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.end_time, monday(12, 0));
    assert_eq!(appointment.charged_amount, 40.0);
    assert_eq!(appointment.confirmation_token.len(), 32);
    assert_eq!(appointment.items.len(), 1);
    assert_eq!(appointment.items[0].prep_minutes, 0);

    let client = env.store.client(env.client.id).await.unwrap();
    assert_eq!(client.total_appointments, 1);

    settle().await;
    let sent = env.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("confirmation:"));
}

#[tokio::test]
async fn rejects_booking_over_the_break() {
    let env = test_env().await;

    let result = env
        .booking
        .book(env.request(monday(12, 30), vec![env.cut.id]))
        .await;

    assert_matches!(
        result,
        Err(SchedulingError::Rule(RuleViolation::BreakOverlap { .. }))
    );
}

#[tokio::test]
async fn rejects_double_booking_against_existing_appointment() {
    let env = test_env().await;

    env.booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap();

    // 11:45 overlaps the 11:30-12:00 appointment whatever the duration.
    let result = env
        .booking
        .book(env.request(monday(11, 45), vec![env.cut.id]))
        .await;
    assert_matches!(result, Err(SchedulingError::DoubleBooking));

    // Back-to-back at 11:00-11:30 is fine (half-open intervals).
    let adjacent = env
        .booking
        .book(env.request(monday(11, 0), vec![env.cut.id]))
        .await;
    assert!(adjacent.is_ok());
}

#[tokio::test]
async fn lead_time_boundary_is_exact_to_the_minute() {
    let env = test_env().await;
    // now = Mon 08:00, lead time 2h: 10:00 is the earliest acceptable start.
    let accepted = env
        .booking
        .book(env.request(monday(10, 0), vec![env.cut.id]))
        .await;
    assert!(accepted.is_ok());

    let rejected = env
        .booking
        .book(env.request(monday(9, 59), vec![env.cut.id]))
        .await;
    assert_matches!(
        rejected,
        Err(SchedulingError::Rule(RuleViolation::LeadTimeTooShort { .. }))
    );
}

#[tokio::test]
async fn multi_service_booking_inserts_prep_between_items() {
    let env = test_env().await;
    let mut request = env.request(monday(9, 0), vec![env.cut.id, env.color.id]);
    request.prep_minutes = Some(15);

    let appointment = env.booking.book(request).await.unwrap();

    // 30 + 45 + 15 of prep: ends at 10:30.
    assert_eq!(appointment.end_time, monday(10, 30));
    assert_eq!(appointment.items[0].prep_minutes, 0);
    assert_eq!(appointment.items[1].prep_minutes, 15);
    assert_eq!(appointment.charged_amount, 100.0);
}

#[tokio::test]
async fn rejects_blocked_client() {
    let env = test_env().await;
    let mut blocked = env.client.clone();
    blocked.blocked = true;
    env.store.insert_client(blocked).await;

    let result = env
        .booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await;
    assert_matches!(result, Err(SchedulingError::ClientBlocked));
}

#[tokio::test]
async fn rejects_client_from_another_salon() {
    let env = test_env().await;
    let mut foreign = env.client.clone();
    foreign.salon_id = Uuid::new_v4();
    env.store.insert_client(foreign).await;

    let err = env
        .booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_matches!(err, SchedulingError::ClientSalonMismatch);
}

#[tokio::test]
async fn rejects_service_from_another_salon() {
    let env = test_env().await;
    let foreign = Service {
        id: Uuid::new_v4(),
        salon_id: Uuid::new_v4(),
        name: "Foreign".to_string(),
        duration_minutes: 30,
        price: 25.0,
        active: true,
    };
    env.store.insert_service(foreign.clone()).await;
    let mut professional = env.professional.clone();
    professional.service_ids.push(foreign.id);
    env.store.insert_professional(professional).await;

    let result = env
        .booking
        .book(env.request(monday(11, 30), vec![foreign.id]))
        .await;
    assert_matches!(
        result,
        Err(SchedulingError::ServiceSalonMismatch { service_id }) if service_id == foreign.id
    );
}

#[tokio::test]
async fn rejects_service_the_professional_does_not_perform() {
    let env = test_env().await;
    let manicure = Service {
        id: Uuid::new_v4(),
        salon_id: env.salon.id,
        name: "Manicure".to_string(),
        duration_minutes: 40,
        price: 30.0,
        active: true,
    };
    env.store.insert_service(manicure.clone()).await;

    let result = env
        .booking
        .book(env.request(monday(11, 0), vec![manicure.id]))
        .await;
    assert_matches!(result, Err(SchedulingError::ServiceNotOffered { .. }));
}

#[tokio::test]
async fn rejects_window_inside_a_time_block() {
    let env = test_env().await;
    env.store
        .insert_time_block(TimeBlock {
            id: Uuid::new_v4(),
            professional_id: env.professional.id,
            start: monday(14, 0),
            end: monday(16, 0),
            reason: Some("training".to_string()),
            recurring: false,
        })
        .await;

    let result = env
        .booking
        .book(env.request(monday(15, 0), vec![env.cut.id]))
        .await;
    assert_matches!(result, Err(SchedulingError::BlockedPeriod));

    // Outside the block is fine.
    let ok = env
        .booking
        .book(env.request(monday(16, 0), vec![env.cut.id]))
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn empty_service_list_is_rejected_upfront() {
    let env = test_env().await;
    let result = env.booking.book(env.request(monday(11, 0), vec![])).await;
    assert_matches!(result, Err(SchedulingError::InvalidRequest(_)));
}

#[tokio::test]
async fn reschedule_forces_pending_and_clears_reminder_flags() {
    let env = test_env().await;
    let appointment = env
        .booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap();
    let confirmed = env.lifecycle.confirm(appointment.id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    // Simulate a sent reminder before the move.
    let mut with_reminder = confirmed.clone();
    with_reminder.reminder_24h_sent = true;
    env.store.save(with_reminder).await.unwrap();

    let moved = env
        .booking
        .reschedule(
            appointment.id,
            RescheduleAppointmentRequest {
                new_start_time: monday(14, 0),
                new_professional_id: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.status, AppointmentStatus::Pending);
    assert_eq!(moved.start_time, monday(14, 0));
    assert_eq!(moved.end_time, monday(14, 30));
    assert!(!moved.reminder_24h_sent);
    assert!(!moved.reminder_2h_sent);
}

#[tokio::test]
async fn reschedule_excludes_the_appointment_itself_from_conflicts() {
    let env = test_env().await;
    let appointment = env
        .booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap();

    // Shifting 15 minutes overlaps the old window; the appointment must not
    // conflict with itself.
    let moved = env
        .booking
        .reschedule(
            appointment.id,
            RescheduleAppointmentRequest {
                new_start_time: monday(11, 45),
                new_professional_id: None,
            },
        )
        .await;
    assert!(moved.is_ok());
}

#[tokio::test]
async fn reschedule_of_terminal_appointment_is_rejected() {
    let env = test_env().await;
    let appointment = env
        .booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap();
    env.lifecycle.confirm(appointment.id).await.unwrap();
    env.lifecycle.start(appointment.id).await.unwrap();
    env.lifecycle.complete(appointment.id).await.unwrap();

    let result = env
        .booking
        .reschedule(
            appointment.id,
            RescheduleAppointmentRequest {
                new_start_time: monday(15, 0),
                new_professional_id: None,
            },
        )
        .await;
    assert_matches!(
        result,
        Err(SchedulingError::InvalidStatusTransition(
            AppointmentStatus::Completed
        ))
    );
}

// A store that fails the first save with a write conflict, as an optimistic
// lock would under a concurrent writer.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    failed_once: AtomicBool,
}

#[async_trait]
impl AppointmentStore for FlakyStore {
    async fn save(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(StoreError::WriteConflict);
        }
        self.inner.save(appointment).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Appointment>, StoreError> {
        self.inner.find_by_token(token).await
    }

    async fn find_conflicting(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.find_conflicting(professional_id, start, end).await
    }

    async fn find_by_professional_and_day(
        &self,
        professional_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner
            .find_by_professional_and_day(professional_id, day)
            .await
    }
}

// A client store whose appointment counter is permanently down.
struct CounterFailStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl ClientStore for CounterFailStore {
    async fn get(&self, id: Uuid) -> Result<Option<Client>, StoreError> {
        self.inner.get(id).await
    }

    async fn increment_appointment_count(&self, _id: Uuid) -> Result<i32, StoreError> {
        Err(StoreError::Unavailable("counter shard down".to_string()))
    }

    async fn increment_no_show(&self, id: Uuid) -> Result<i32, StoreError> {
        self.inner.increment_no_show(id).await
    }

    async fn set_blocked(&self, id: Uuid, blocked: bool) -> Result<(), StoreError> {
        self.inner.set_blocked(id, blocked).await
    }
}

#[tokio::test]
async fn counter_failure_does_not_fail_a_persisted_booking() {
    let env = test_env().await;
    let clients = Arc::new(CounterFailStore {
        inner: env.store.clone(),
    });
    let booking = BookingService::new(
        env.store.clone(),
        env.store.clone(),
        clients,
        env.store.clone(),
        env.store.clone(),
        env.notifier.clone(),
        env.clock.clone(),
        EngineConfig::default(),
    );

    let appointment = booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap();

    // The booking stands and occupies the calendar; only the counter lagged.
    let stored = env.store.appointment(appointment.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Pending);
    let client = env.store.client(env.client.id).await.unwrap();
    assert_eq!(client.total_appointments, 0);
}

#[tokio::test]
async fn write_conflict_is_retried_once_before_surfacing() {
    let env = test_env().await;
    let flaky = Arc::new(FlakyStore {
        inner: env.store.clone(),
        failed_once: AtomicBool::new(false),
    });
    let booking = BookingService::new(
        env.store.clone(),
        env.store.clone(),
        env.store.clone(),
        flaky,
        env.store.clone(),
        env.notifier.clone(),
        env.clock.clone(),
        EngineConfig::default(),
    );

    let appointment = booking
        .book(env.request(monday(11, 30), vec![env.cut.id]))
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Pending);
}
