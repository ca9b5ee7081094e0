use std::env;
use tracing::warn;

/// Engine-level knobs. Per-salon policy (lead time, cancellation notice,
/// no-show limits) lives on the salon record, not here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Extra attempts after a `WriteConflict` from the appointment store.
    pub write_retry_attempts: u32,
    /// How many days ahead the alternative-slot search may scan.
    pub slot_search_days: i64,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            write_retry_attempts: env::var("SCHEDULER_WRITE_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SCHEDULER_WRITE_RETRY_ATTEMPTS not set, defaulting to 1");
                    1
                }),
            slot_search_days: env::var("SCHEDULER_SLOT_SEARCH_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SCHEDULER_SLOT_SEARCH_DAYS not set, defaulting to 7");
                    7
                }),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            write_retry_attempts: 1,
            slot_search_days: 7,
        }
    }
}
