//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every operational parameter can be overridden through the environment;
//! the helpers below apply the fallback.

use std::path::PathBuf;

/// Default directory holding the live Zeek logs
pub const DEFAULT_LOG_DIR: &str = "/opt/zeek/spool/zeek";

/// Default output CSV (NSL-KDD formatted rows + score + label)
pub const DEFAULT_OUTPUT_FILE: &str = "nslkdd_format.csv";

/// Default poll interval (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Default decision threshold for the attack label
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Trailing duration of the time window (seconds)
pub const DEFAULT_TIME_WINDOW_SECS: f64 = 2.0;

/// Capacity of the per-destination count window
pub const DEFAULT_COUNT_WINDOW_CAP: usize = 100;

/// Keys with no activity for this long are evicted (seconds)
pub const DEFAULT_IDLE_EVICTION_SECS: f64 = 300.0;

/// Records older than this relative to the key's newest timestamp
/// are still aggregated but flagged late (seconds)
pub const DEFAULT_LATE_TOLERANCE_SECS: f64 = 5.0;

/// Predictions retained in the live feed for the dashboard consumer
pub const DEFAULT_FEED_CAPACITY: usize = 500;

/// Default Elasticsearch bulk batch size
pub const DEFAULT_ES_BATCH_SIZE: usize = 1000;

/// Default Elasticsearch index name
pub const DEFAULT_ES_INDEX: &str = "zeek-ids-analytics";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "zeek-ids-core";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Directory holding live Zeek logs, from environment or default
pub fn get_log_dir() -> PathBuf {
    std::env::var("IDS_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR))
}

/// Output CSV path from environment or default
pub fn get_output_file() -> PathBuf {
    std::env::var("IDS_OUTPUT_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_FILE))
}

/// Model artifact path. Required: there is no usable fallback scorer.
pub fn get_model_path() -> Option<PathBuf> {
    std::env::var("IDS_MODEL_PATH").ok().map(PathBuf::from)
}

/// Poll interval from environment or default
pub fn get_poll_interval() -> u64 {
    std::env::var("IDS_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
}

/// Decision threshold from environment or default
pub fn get_threshold() -> f32 {
    std::env::var("IDS_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_THRESHOLD)
}

/// Time-window duration from environment or default
pub fn get_time_window() -> f64 {
    std::env::var("IDS_TIME_WINDOW_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TIME_WINDOW_SECS)
}

/// Count-window capacity from environment or default
pub fn get_count_window_cap() -> usize {
    std::env::var("IDS_COUNT_WINDOW_CAP")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_COUNT_WINDOW_CAP)
}

/// Idle-key eviction timeout from environment or default
pub fn get_idle_eviction() -> f64 {
    std::env::var("IDS_IDLE_EVICTION_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_IDLE_EVICTION_SECS)
}

/// Late-arrival tolerance from environment or default
pub fn get_late_tolerance() -> f64 {
    std::env::var("IDS_LATE_TOLERANCE_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_LATE_TOLERANCE_SECS)
}

/// Check if Elasticsearch forwarding is enabled
pub fn is_elastic_enabled() -> bool {
    std::env::var("IDS_ES_ENABLED")
        .map(|s| s.to_lowercase() == "true" || s == "1")
        .unwrap_or(false)
}

/// Elasticsearch endpoint URL
pub fn get_elastic_url() -> String {
    std::env::var("IDS_ES_URL").unwrap_or_else(|_| "https://localhost:9200".to_string())
}

/// Elasticsearch API key (sent as `ApiKey` authorization)
pub fn get_elastic_api_key() -> Option<String> {
    std::env::var("IDS_ES_API_KEY").ok()
}

/// Elasticsearch target index
pub fn get_elastic_index() -> String {
    std::env::var("IDS_ES_INDEX").unwrap_or_else(|_| DEFAULT_ES_INDEX.to_string())
}

/// Elasticsearch bulk batch size from environment or default
pub fn get_es_batch_size() -> usize {
    std::env::var("IDS_ES_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_ES_BATCH_SIZE)
}

/// Directory for persisted pipeline state (read offsets)
pub fn get_state_dir() -> PathBuf {
    std::env::var("IDS_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("zeek-ids")
        })
}
