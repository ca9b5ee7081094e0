// libs/shared/database/src/memory.rs
//
// In-memory implementation of every collaborator store. Backs the cells'
// integration tests and local development; real deployments plug a database
// adapter into the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use tokio::sync::RwLock;
use uuid::Uuid;

use appointment_cell::models::Appointment;
use appointment_cell::store::AppointmentStore;
use salon_cell::models::{Client, Professional, Salon, Service, TimeBlock, WorkingHours};
use salon_cell::store::{CatalogStore, ClientStore, TimeBlockStore, WorkingHoursStore};
use shared_models::StoreError;

#[derive(Default)]
struct State {
    salons: HashMap<Uuid, Salon>,
    professionals: HashMap<Uuid, Professional>,
    services: HashMap<Uuid, Service>,
    clients: HashMap<Uuid, Client>,
    working_hours: HashMap<(Uuid, Weekday), WorkingHours>,
    time_blocks: HashMap<Uuid, TimeBlock>,
    appointments: HashMap<Uuid, Appointment>,
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_salon(&self, salon: Salon) {
        self.state.write().await.salons.insert(salon.id, salon);
    }

    pub async fn insert_professional(&self, professional: Professional) {
        self.state
            .write()
            .await
            .professionals
            .insert(professional.id, professional);
    }

    pub async fn insert_service(&self, service: Service) {
        self.state
            .write()
            .await
            .services
            .insert(service.id, service);
    }

    pub async fn insert_client(&self, client: Client) {
        self.state.write().await.clients.insert(client.id, client);
    }

    /// Upholds the uniqueness invariant: at most one WorkingHours row per
    /// (professional, weekday), and the row must be well formed.
    pub async fn insert_working_hours(&self, hours: WorkingHours) -> Result<(), StoreError> {
        if !hours.is_well_formed() {
            return Err(StoreError::Unavailable(
                "malformed working hours record".to_string(),
            ));
        }
        let key = (hours.professional_id, hours.weekday);
        let mut state = self.state.write().await;
        if state.working_hours.contains_key(&key) {
            return Err(StoreError::WriteConflict);
        }
        state.working_hours.insert(key, hours);
        Ok(())
    }

    pub async fn insert_time_block(&self, block: TimeBlock) {
        self.state
            .write()
            .await
            .time_blocks
            .insert(block.id, block);
    }

    pub async fn appointment(&self, id: Uuid) -> Option<Appointment> {
        self.state.read().await.appointments.get(&id).cloned()
    }

    pub async fn client(&self, id: Uuid) -> Option<Client> {
        self.state.read().await.clients.get(&id).cloned()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn salon(&self, id: Uuid) -> Result<Option<Salon>, StoreError> {
        Ok(self.state.read().await.salons.get(&id).cloned())
    }

    async fn professional(&self, id: Uuid) -> Result<Option<Professional>, StoreError> {
        Ok(self.state.read().await.professionals.get(&id).cloned())
    }

    async fn services_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Service>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.services.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl WorkingHoursStore for MemoryStore {
    async fn find(
        &self,
        professional_id: Uuid,
        weekday: Weekday,
    ) -> Result<Option<WorkingHours>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .working_hours
            .get(&(professional_id, weekday))
            .cloned())
    }
}

#[async_trait]
impl TimeBlockStore for MemoryStore {
    async fn find_conflicting(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .time_blocks
            .values()
            .filter(|block| block.professional_id == professional_id)
            .filter(|block| block.covers(start, end))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Client>, StoreError> {
        Ok(self.state.read().await.clients.get(&id).cloned())
    }

    async fn increment_appointment_count(&self, id: Uuid) -> Result<i32, StoreError> {
        let mut state = self.state.write().await;
        let client = state
            .clients
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("client {id}")))?;
        client.total_appointments += 1;
        Ok(client.total_appointments)
    }

    async fn increment_no_show(&self, id: Uuid) -> Result<i32, StoreError> {
        let mut state = self.state.write().await;
        let client = state
            .clients
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("client {id}")))?;
        client.no_show_count += 1;
        Ok(client.no_show_count)
    }

    async fn set_blocked(&self, id: Uuid, blocked: bool) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let client = state
            .clients
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("client {id}")))?;
        client.blocked = blocked;
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn save(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut state = self.state.write().await;
        state
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.state.read().await.appointments.get(&id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .appointments
            .values()
            .find(|a| a.confirmation_token == token)
            .cloned())
    }

    async fn find_conflicting(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        let mut found: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.professional_id == professional_id)
            .filter(|a| a.start_time < end && start < a.end_time)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time);
        Ok(found)
    }

    async fn find_by_professional_and_day(
        &self,
        professional_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        let mut found: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.professional_id == professional_id)
            .filter(|a| a.start_time.date_naive() == day)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time);
        Ok(found)
    }
}
