#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use uuid::Uuid;

use appointment_cell::models::{Appointment, BookAppointmentRequest};
use appointment_cell::services::booking::BookingService;
use appointment_cell::services::lifecycle::AppointmentLifecycleService;
use appointment_cell::store::Notifier;
use salon_cell::models::{Client, Professional, Salon, Service, WorkingHours};
use shared_config::EngineConfig;
use shared_database::MemoryStore;
use shared_utils::FixedClock;

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Monday 2025-06-02 at the given time-of-day.
pub fn monday(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
}

/// Records dispatched notifications; can be told to fail every call.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn confirmation_link(&self, appointment: &Appointment) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("smtp unreachable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push(format!("confirmation:{}", appointment.id));
        Ok(())
    }

    async fn cancellation(&self, appointment: &Appointment, reason: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("smtp unreachable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push(format!("cancellation:{}:{}", appointment.id, reason));
        Ok(())
    }
}

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub booking: Arc<BookingService>,
    pub lifecycle: AppointmentLifecycleService,
    pub salon: Salon,
    pub professional: Professional,
    pub client: Client,
    /// 30-minute service, price 40.
    pub cut: Service,
    /// 45-minute service, price 60.
    pub color: Service,
}

/// Salon open 08:00-18:00, lead/cancel notice 2h, 3 no-shows allowed;
/// professional works Mondays 09:00-17:00 with a 12:00-13:00 break.
/// The clock starts at Monday 08:00.
pub async fn test_env() -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(monday(8, 0)));
    let notifier = Arc::new(RecordingNotifier::default());

    let salon = Salon {
        id: Uuid::new_v4(),
        name: "Studio Norte".to_string(),
        opens_at: time(8, 0),
        closes_at: time(18, 0),
        min_lead_hours: 2,
        min_cancel_hours: 2,
        max_no_shows: 3,
        booking_interval_minutes: 15,
        accepts_online_booking: true,
        active: true,
    };
    let cut = Service {
        id: Uuid::new_v4(),
        salon_id: salon.id,
        name: "Cut".to_string(),
        duration_minutes: 30,
        price: 40.0,
        active: true,
    };
    let color = Service {
        id: Uuid::new_v4(),
        salon_id: salon.id,
        name: "Color".to_string(),
        duration_minutes: 45,
        price: 60.0,
        active: true,
    };
    let professional = Professional {
        id: Uuid::new_v4(),
        salon_id: salon.id,
        name: "Ana".to_string(),
        accepts_online_booking: true,
        service_ids: vec![cut.id, color.id],
    };
    let client = Client {
        id: Uuid::new_v4(),
        salon_id: salon.id,
        name: "Rui".to_string(),
        total_appointments: 0,
        no_show_count: 0,
        blocked: false,
    };

    store.insert_salon(salon.clone()).await;
    store.insert_service(cut.clone()).await;
    store.insert_service(color.clone()).await;
    store.insert_professional(professional.clone()).await;
    store.insert_client(client.clone()).await;
    store
        .insert_working_hours(WorkingHours {
            professional_id: professional.id,
            weekday: Weekday::Mon,
            start_time: time(9, 0),
            end_time: time(17, 0),
            break_start: time(12, 0),
            break_end: time(13, 0),
            active: true,
        })
        .await
        .unwrap();

    let booking = Arc::new(BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        notifier.clone(),
        clock.clone(),
        EngineConfig::default(),
    ));
    let lifecycle = AppointmentLifecycleService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier.clone(),
        clock.clone(),
    );

    TestEnv {
        store,
        clock,
        notifier,
        booking,
        lifecycle,
        salon,
        professional,
        client,
        cut,
        color,
    }
}

impl TestEnv {
    pub fn request(&self, start: DateTime<Utc>, service_ids: Vec<Uuid>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            salon_id: self.salon.id,
            client_id: self.client.id,
            professional_id: self.professional.id,
            service_ids,
            start_time: start,
            prep_minutes: None,
        }
    }
}

/// Give spawned fire-and-forget notification tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
