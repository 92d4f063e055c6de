//! Window state
//!
//! Two bounded retention rules over the same entry shape: a time window
//! keeps entries within a trailing duration of the newest record's
//! timestamp, a count window keeps the last N entries. Both are driven
//! purely by record timestamps so replays are deterministic.

use std::collections::VecDeque;

/// SYN-error connection states (connection attempt went nowhere).
const SERROR_FLAGS: &[&str] = &["S0", "RSTOS0", "SH"];

/// Rejected connection states.
const RERROR_FLAGS: &[&str] = &["REJ"];

/// One observed outcome inside a window.
#[derive(Debug, Clone)]
pub struct WindowEntry {
    pub ts: f64,
    pub service: String,
    pub serror: bool,
    pub rerror: bool,
}

impl WindowEntry {
    pub fn new(ts: f64, service: &str, conn_state: Option<&str>) -> Self {
        let flag = conn_state.unwrap_or("OTH");
        Self {
            ts,
            service: service.to_string(),
            serror: SERROR_FLAGS.contains(&flag),
            rerror: RERROR_FLAGS.contains(&flag),
        }
    }
}

/// Counters derived from a window's live entries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowCounters {
    pub count: u32,
    pub same_srv: u32,
    pub serror: u32,
    pub rerror: u32,
    pub distinct_services: u32,
}

impl WindowCounters {
    fn compute(entries: &[WindowEntry], current_service: &str) -> Self {
        let mut seen: Vec<&str> = Vec::new();
        let mut counters = WindowCounters::default();
        for entry in entries {
            counters.count += 1;
            if entry.service == current_service {
                counters.same_srv += 1;
            }
            if entry.serror {
                counters.serror += 1;
            }
            if entry.rerror {
                counters.rerror += 1;
            }
            if !seen.contains(&entry.service.as_str()) {
                seen.push(&entry.service);
            }
        }
        counters.distinct_services = seen.len() as u32;
        counters
    }
}

/// Trailing-duration window. Eviction is lazy: expired entries are
/// removed on the next append, before counters are read.
#[derive(Debug)]
pub struct TimeWindow {
    entries: Vec<WindowEntry>,
    duration: f64,
    max_ts: f64,
}

impl TimeWindow {
    pub fn new(duration: f64) -> Self {
        Self {
            entries: Vec::new(),
            duration,
            max_ts: f64::NEG_INFINITY,
        }
    }

    /// Newest timestamp ever observed by this window.
    pub fn max_ts(&self) -> f64 {
        self.max_ts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append, evict everything outside the trailing duration measured
    /// from the newest timestamp, then return post-update counters.
    pub fn observe(&mut self, entry: WindowEntry, current_service: &str) -> WindowCounters {
        self.max_ts = self.max_ts.max(entry.ts);
        self.entries.push(entry);

        let cutoff = self.max_ts - self.duration;
        self.entries.retain(|e| e.ts >= cutoff);

        WindowCounters::compute(&self.entries, current_service)
    }
}

/// Last-N window. Retention ignores time entirely.
#[derive(Debug)]
pub struct CountWindow {
    entries: VecDeque<WindowEntry>,
    capacity: usize,
    max_ts: f64,
}

impl CountWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            max_ts: f64::NEG_INFINITY,
        }
    }

    pub fn max_ts(&self) -> f64 {
        self.max_ts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn observe(&mut self, entry: WindowEntry, current_service: &str) -> WindowCounters {
        self.max_ts = self.max_ts.max(entry.ts);
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }

        let (a, b) = self.entries.as_slices();
        if b.is_empty() {
            WindowCounters::compute(a, current_service)
        } else {
            let flat: Vec<WindowEntry> = self.entries.iter().cloned().collect();
            WindowCounters::compute(&flat, current_service)
        }
    }
}
