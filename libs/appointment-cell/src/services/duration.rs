// libs/appointment-cell/src/services/duration.rs
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use salon_cell::models::Service;

use crate::models::{AppointmentExtent, AppointmentLineItem, SchedulingError};

/// Turns an ordered service list into one contiguous time extent, inserting
/// the prep buffer before every service after the first.
pub struct DurationService;

impl DurationService {
    pub fn new() -> Self {
        Self
    }

    /// `total = Σ duration_i + prep × (n - 1)`; the first line item carries
    /// no prep time. An empty list is a programmer error: callers must
    /// reject it upstream.
    pub fn compute(
        &self,
        salon_id: Uuid,
        services: &[Service],
        prep_minutes: i32,
        start_time: DateTime<Utc>,
    ) -> Result<AppointmentExtent, SchedulingError> {
        if services.is_empty() {
            return Err(SchedulingError::InvalidRequest(
                "service list must not be empty".to_string(),
            ));
        }
        if prep_minutes < 0 {
            return Err(SchedulingError::InvalidRequest(
                "prep_minutes must not be negative".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(services.len());
        let mut total_minutes: i64 = 0;
        let mut charged_amount = 0.0;

        for (index, service) in services.iter().enumerate() {
            if service.salon_id != salon_id {
                return Err(SchedulingError::ServiceSalonMismatch {
                    service_id: service.id,
                });
            }
            if service.duration_minutes <= 0 {
                return Err(SchedulingError::InvalidRequest(format!(
                    "service {} has non-positive duration",
                    service.id
                )));
            }

            let prep = if index == 0 { 0 } else { prep_minutes };
            total_minutes += (service.duration_minutes + prep) as i64;
            charged_amount += service.price;

            items.push(AppointmentLineItem {
                service_id: service.id,
                duration_minutes: service.duration_minutes,
                prep_minutes: prep,
                price: service.price,
            });
        }

        let end_time = start_time + Duration::minutes(total_minutes);
        debug!(
            "Computed extent for {} services: {} minutes, ends {}",
            services.len(),
            total_minutes,
            end_time
        );

        Ok(AppointmentExtent {
            end_time,
            total_minutes,
            charged_amount,
            items,
        })
    }
}

impl Default for DurationService {
    fn default() -> Self {
        Self::new()
    }
}
