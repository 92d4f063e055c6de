//! Pipeline configuration
//!
//! `Default` reads the environment so a bare `PipelineConfig::default()`
//! matches what the operator configured; explicit construction is used by
//! the tests.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory scanned for live Zeek logs (conn.log plus protocol logs)
    pub log_dir: PathBuf,
    /// Explicit file list overriding the directory scan, when non-empty
    pub log_files: Vec<PathBuf>,
    /// Output CSV path (primary record of truth)
    pub output_file: PathBuf,
    /// Trained ONNX scorer
    pub model_path: PathBuf,
    /// Poll interval in seconds
    pub poll_interval_secs: u64,
    /// Decision threshold for the attack label
    pub threshold: f32,
    /// Trailing duration of the time window in seconds
    pub time_window_secs: f64,
    /// Capacity of the per-destination count window
    pub count_window_cap: usize,
    /// Idle-key eviction timeout in seconds
    pub idle_eviction_secs: f64,
    /// Late-arrival tolerance in seconds
    pub late_tolerance_secs: f64,
    /// Live feed retention (latest N predictions)
    pub feed_capacity: usize,
    /// Directory for persisted read offsets
    pub state_dir: PathBuf,
    /// Optional Elasticsearch forwarding
    pub elastic: Option<ElasticConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub index: String,
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let files = std::env::var("IDS_LOG_FILES")
            .map(|s| s.split(',').map(PathBuf::from).collect())
            .unwrap_or_default();

        Self {
            log_dir: constants::get_log_dir(),
            log_files: files,
            output_file: constants::get_output_file(),
            model_path: constants::get_model_path().unwrap_or_default(),
            poll_interval_secs: constants::get_poll_interval(),
            threshold: constants::get_threshold(),
            time_window_secs: constants::get_time_window(),
            count_window_cap: constants::get_count_window_cap(),
            idle_eviction_secs: constants::get_idle_eviction(),
            late_tolerance_secs: constants::get_late_tolerance(),
            feed_capacity: constants::DEFAULT_FEED_CAPACITY,
            state_dir: constants::get_state_dir(),
            elastic: if constants::is_elastic_enabled() {
                Some(ElasticConfig {
                    url: constants::get_elastic_url(),
                    api_key: constants::get_elastic_api_key(),
                    index: constants::get_elastic_index(),
                    batch_size: constants::get_es_batch_size(),
                })
            } else {
                None
            },
        }
    }
}

impl PipelineConfig {
    /// Startup validation; any failure here refuses to run.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "IDS_MODEL_PATH is required (path to the trained ONNX scorer)".into(),
            ));
        }
        if self.log_files.is_empty() && self.log_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "no log sources: set IDS_LOG_DIR or IDS_LOG_FILES".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(PipelineError::Config(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if self.count_window_cap == 0 {
            return Err(PipelineError::Config("count window capacity must be > 0".into()));
        }
        if self.time_window_secs <= 0.0 {
            return Err(PipelineError::Config("time window duration must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PipelineConfig {
        PipelineConfig {
            log_dir: PathBuf::from("/tmp/zeek"),
            log_files: vec![],
            output_file: PathBuf::from("/tmp/out.csv"),
            model_path: PathBuf::from("/tmp/model.onnx"),
            poll_interval_secs: 1,
            threshold: 0.5,
            time_window_secs: 2.0,
            count_window_cap: 100,
            idle_eviction_secs: 300.0,
            late_tolerance_secs: 5.0,
            feed_capacity: 500,
            state_dir: PathBuf::from("/tmp/state"),
            elastic: None,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_model_path_is_fatal() {
        let mut cfg = valid_config();
        cfg.model_path = PathBuf::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_threshold_out_of_range_is_fatal() {
        let mut cfg = valid_config();
        cfg.threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_count_window_is_fatal() {
        let mut cfg = valid_config();
        cfg.count_window_cap = 0;
        assert!(cfg.validate().is_err());
    }
}
