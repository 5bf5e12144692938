use serde::{Deserialize, Serialize};

/// Mid-call billing ticker and ghost-call watchdog tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "d_ticker_interval_secs")]
    pub ticker_interval_secs: u64,
    #[serde(default = "d_ticker_deduct_minutes")]
    pub ticker_deduct_minutes: String,
    #[serde(default = "d_watchdog_interval_secs")]
    pub ghost_watchdog_interval_secs: u64,
    #[serde(default = "d_ghost_threshold_secs")]
    pub ghost_silence_threshold_secs: u64,
    #[serde(default = "d_max_cas_retries")]
    pub max_cas_retries: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            ticker_interval_secs: d_ticker_interval_secs(),
            ticker_deduct_minutes: d_ticker_deduct_minutes(),
            ghost_watchdog_interval_secs: d_watchdog_interval_secs(),
            ghost_silence_threshold_secs: d_ghost_threshold_secs(),
            max_cas_retries: d_max_cas_retries(),
        }
    }
}

fn d_ticker_interval_secs() -> u64 {
    30
}
fn d_ticker_deduct_minutes() -> String {
    "0.5".into()
}
fn d_watchdog_interval_secs() -> u64 {
    5
}
fn d_ghost_threshold_secs() -> u64 {
    10
}
fn d_max_cas_retries() -> u32 {
    3
}
