//! Window Aggregator - sliding traffic statistics
//!
//! Keeps time windows keyed by destination host and by service, plus a
//! count window keyed by destination host, and folds each conn record
//! into all three before handing the encoder a post-update snapshot.
//! Everything is driven by record timestamps: no wall clock touches the
//! counters, so an identical input sequence always produces identical
//! snapshots.
//!
//! Windowing scheme (one scheme per feature, no blending): the time
//! windows feed `count`/`srv_count` and the rate features; the count
//! window feeds only the `dst_host_*` family.

pub mod state;


use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::logic::decoder::ConnRecord;
use state::{CountWindow, TimeWindow, WindowCounters, WindowEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Trailing duration of the time windows (seconds)
    pub time_window_secs: f64,
    /// Capacity of the per-destination count window
    pub count_window_cap: usize,
    /// Keys idle longer than this are evicted (seconds)
    pub idle_eviction_secs: f64,
    /// Arrivals older than this against the key's newest timestamp are
    /// flagged late (seconds)
    pub late_tolerance_secs: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            time_window_secs: crate::constants::DEFAULT_TIME_WINDOW_SECS,
            count_window_cap: crate::constants::DEFAULT_COUNT_WINDOW_CAP,
            idle_eviction_secs: crate::constants::DEFAULT_IDLE_EVICTION_SECS,
            late_tolerance_secs: crate::constants::DEFAULT_LATE_TOLERANCE_SECS,
        }
    }
}

/// Post-update counters handed to the encoder. Rates are already
/// normalized to [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    // Time window, destination-host key
    pub count: u32,
    pub serror_rate: f32,
    pub rerror_rate: f32,
    pub same_srv_rate: f32,
    pub diff_srv_rate: f32,
    // Time window, service key
    pub srv_count: u32,
    pub srv_serror_rate: f32,
    // Count window, destination-host key
    pub dst_host_count: u32,
    pub dst_host_srv_count: u32,
    pub dst_host_same_srv_rate: f32,
    pub dst_host_serror_rate: f32,
    pub dst_host_rerror_rate: f32,
    /// Arrived beyond the lateness bound; aggregated anyway
    pub late: bool,
}

fn rate(part: u32, whole: u32) -> f32 {
    if whole == 0 {
        0.0
    } else {
        part as f32 / whole as f32
    }
}

/// Owned aggregation state. Mutated only through `observe` and
/// `evict_idle`; lifecycle is bound to the orchestrator's Running state.
pub struct WindowAggregator {
    config: WindowConfig,
    host_time: HashMap<String, TimeWindow>,
    srv_time: HashMap<String, TimeWindow>,
    host_count: HashMap<String, CountWindow>,
    /// Newest timestamp seen across all keys
    latest_ts: f64,
}

impl WindowAggregator {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            host_time: HashMap::new(),
            srv_time: HashMap::new(),
            host_count: HashMap::new(),
            latest_ts: f64::NEG_INFINITY,
        }
    }

    /// Number of live window keys (cardinality metric).
    pub fn active_keys(&self) -> usize {
        self.host_time.len() + self.srv_time.len() + self.host_count.len()
    }

    /// Fold one record into every relevant window and return the
    /// post-update snapshot.
    pub fn observe(&mut self, record: &ConnRecord) -> WindowSnapshot {
        let service = record.service_or_other().to_string();
        let flag = record.conn_state.as_deref();
        let host_key = record.resp_h.clone();

        let host_window = self
            .host_time
            .entry(host_key.clone())
            .or_insert_with(|| TimeWindow::new(self.config.time_window_secs));
        let late = host_window.max_ts().is_finite()
            && record.ts < host_window.max_ts() - self.config.late_tolerance_secs;
        let host: WindowCounters =
            host_window.observe(WindowEntry::new(record.ts, &service, flag), &service);

        let srv: WindowCounters = self
            .srv_time
            .entry(service.clone())
            .or_insert_with(|| TimeWindow::new(self.config.time_window_secs))
            .observe(WindowEntry::new(record.ts, &service, flag), &service);

        let dst: WindowCounters = self
            .host_count
            .entry(host_key)
            .or_insert_with(|| CountWindow::new(self.config.count_window_cap))
            .observe(WindowEntry::new(record.ts, &service, flag), &service);

        self.latest_ts = self.latest_ts.max(record.ts);

        WindowSnapshot {
            count: host.count,
            serror_rate: rate(host.serror, host.count),
            rerror_rate: rate(host.rerror, host.count),
            same_srv_rate: rate(host.same_srv, host.count),
            diff_srv_rate: rate(host.count - host.same_srv, host.count),
            srv_count: srv.count,
            srv_serror_rate: rate(srv.serror, srv.count),
            dst_host_count: dst.count,
            dst_host_srv_count: dst.same_srv,
            dst_host_same_srv_rate: rate(dst.same_srv, dst.count),
            dst_host_serror_rate: rate(dst.serror, dst.count),
            dst_host_rerror_rate: rate(dst.rerror, dst.count),
            late,
        }
    }

    /// Drop keys whose newest entry is older than the idle timeout,
    /// measured against the newest timestamp the aggregator has seen.
    /// Returns the number of evicted keys.
    pub fn evict_idle(&mut self) -> usize {
        if !self.latest_ts.is_finite() {
            return 0;
        }
        let cutoff = self.latest_ts - self.config.idle_eviction_secs;
        let before = self.active_keys();
        self.host_time.retain(|_, w| w.max_ts() >= cutoff);
        self.srv_time.retain(|_, w| w.max_ts() >= cutoff);
        self.host_count.retain(|_, w| w.max_ts() >= cutoff);
        let evicted = before - self.active_keys();
        if evicted > 0 {
            log::debug!("Evicted {} idle window keys", evicted);
        }
        evicted
    }
}
