//! Pipeline Orchestrator
//!
//! Owns every stage and drives the poll cycle: tail the logs, decode,
//! enrich, aggregate, encode, score, sink. Offsets are committed only
//! after the CSV sink has flushed, so a crash between the two re-scores
//! a few records rather than losing any.
//!
//! Record timestamps drive all windowing; wall time is only used for
//! the poll cadence and status reporting.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::logic::config::PipelineConfig;
use crate::logic::decoder::enrich::DEFAULT_ENRICHMENT_CAP;
use crate::logic::decoder::{Decoded, EnrichmentCache, ZeekDecoder};
use crate::logic::error::PipelineResult;
use crate::logic::features::encode;
use crate::logic::model::{Scorer, ThresholdConfig};
use crate::logic::sink::{ClassificationResult, CsvSink, ElasticForwarder, LiveFeed};
use crate::logic::tailer::{LogTailer, OffsetStore};
use crate::logic::window::{WindowAggregator, WindowConfig};

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub path: PathBuf,
    pub kind: String,
    /// Bytes between committed offset and current file size
    pub lag: u64,
}

/// Snapshot of the pipeline for logging and the live feed consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub last_cycle: Option<DateTime<Utc>>,
    pub records_scored: u64,
    pub attacks: u64,
    pub aux_records: u64,
    pub malformed_lines: u64,
    pub inference_failures: u64,
    pub active_window_keys: usize,
    pub sources: Vec<SourceStatus>,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
            last_cycle: None,
            records_scored: 0,
            attacks: 0,
            aux_records: 0,
            malformed_lines: 0,
            inference_failures: 0,
            active_window_keys: 0,
            sources: Vec::new(),
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
    store: OffsetStore,
    tailer: LogTailer,
    decoders: HashMap<PathBuf, ZeekDecoder>,
    enrichment: EnrichmentCache,
    aggregator: WindowAggregator,
    scorer: Scorer,
    csv: CsvSink,
    feed: LiveFeed,
    forwarder: Option<ElasticForwarder>,
    status: Arc<RwLock<PipelineStatus>>,
}

impl Pipeline {
    /// Build every stage. Model and sink failures here are fatal; the
    /// caller reports and exits.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;

        let scorer = Scorer::load(&config.model_path, ThresholdConfig::new(config.threshold))?;
        let csv = CsvSink::open(&config.output_file)?;
        let store = OffsetStore::load(&config.state_dir);

        let scan_dir = if config.log_files.is_empty() {
            Some(config.log_dir.clone())
        } else {
            None
        };
        let tailer = LogTailer::new(scan_dir, config.log_files.clone(), &store);

        let window_config = WindowConfig {
            time_window_secs: config.time_window_secs,
            count_window_cap: config.count_window_cap,
            idle_eviction_secs: config.idle_eviction_secs,
            late_tolerance_secs: config.late_tolerance_secs,
        };

        let forwarder = config
            .elastic
            .clone()
            .map(ElasticForwarder::start);

        Ok(Self {
            feed: LiveFeed::new(config.feed_capacity),
            aggregator: WindowAggregator::new(window_config),
            enrichment: EnrichmentCache::new(DEFAULT_ENRICHMENT_CAP),
            decoders: HashMap::new(),
            scorer,
            csv,
            store,
            tailer,
            forwarder,
            status: Arc::new(RwLock::new(PipelineStatus::default())),
            config,
        })
    }

    /// Shared handle for status readers outside the pipeline thread.
    pub fn status_handle(&self) -> Arc<RwLock<PipelineStatus>> {
        Arc::clone(&self.status)
    }

    pub fn feed(&self) -> LiveFeed {
        self.feed.clone()
    }

    /// Poll until `shutdown` is raised, then drain and stop.
    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        self.status.write().state = PipelineState::Running;
        log::info!(
            "Pipeline running: poll every {}s, threshold {}",
            self.config.poll_interval_secs,
            self.scorer.threshold()
        );

        while !shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.cycle() {
                log::error!("Poll cycle failed: {}", e);
            }
            std::thread::sleep(Duration::from_secs(self.config.poll_interval_secs));
        }

        self.status.write().state = PipelineState::Draining;
        log::info!("Shutdown requested, draining");
        if let Err(e) = self.cycle() {
            log::error!("Drain cycle failed: {}", e);
        }

        if let Some(forwarder) = self.forwarder.take() {
            forwarder.stop();
        }

        let engine = self.scorer.status();
        log::info!(
            "Inference: {} calls, avg {:.2} ms ({})",
            engine.inference_count,
            engine.avg_latency_ms,
            engine.model_path
        );
        self.status.write().state = PipelineState::Stopped;
        log::info!("Pipeline stopped");
    }

    /// One full poll cycle. Malformed lines and per-record inference
    /// failures are counted and skipped; an I/O failure aborts the
    /// cycle before offsets commit and rolls the tailer back to the
    /// last committed position, so the aborted batch is re-read next
    /// cycle (re-scored, never lost).
    pub fn cycle(&mut self) -> PipelineResult<()> {
        for path in self.tailer.refresh_sources(&self.store, true) {
            self.store.remove(&path);
        }

        let saved = self.tailer.cursors();
        match self.cycle_inner() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.tailer.rewind(&saved);
                Err(e)
            }
        }
    }

    fn cycle_inner(&mut self) -> PipelineResult<()> {
        let mut conns = Vec::new();
        let mut malformed = 0u64;
        let mut aux_count = 0u64;

        for (idx, batch) in self.tailer.poll_all() {
            let source = &self.tailer.sources()[idx];
            let path = source.path().to_path_buf();
            let kind = source.kind();

            let decoder = self
                .decoders
                .entry(path)
                .or_insert_with(|| ZeekDecoder::new(kind));
            if batch.rotated {
                decoder.reset();
            }

            for line in &batch.lines {
                match decoder.decode_line(line) {
                    Ok(Some(Decoded::Conn(record))) => conns.push(record),
                    Ok(Some(Decoded::Aux(aux))) => {
                        self.enrichment.observe(&aux);
                        aux_count += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        malformed += 1;
                        log::debug!("Skipping malformed line: {}", e);
                    }
                }
            }
        }

        // Aux logs for a connection usually land before or alongside its
        // conn entry; sorting by timestamp keeps window math deterministic.
        conns.sort_by(|a, b| a.ts.total_cmp(&b.ts));

        let mut scored = 0u64;
        let mut attacks = 0u64;
        let mut failures = 0u64;

        for record in &conns {
            let snapshot = self.aggregator.observe(record);
            let extras = self.enrichment.get(&record.uid);
            let vector = encode(record, &snapshot, extras);

            match self.scorer.score(&vector) {
                Ok(prediction) => {
                    let result =
                        ClassificationResult::new(record, vector, &prediction, snapshot.late);
                    if result.is_attack() {
                        attacks += 1;
                        log::warn!(
                            "Attack detected: {} {} -> {} p={:.3}",
                            result.uid,
                            result.orig_h,
                            result.resp_h,
                            result.probability
                        );
                    }
                    self.csv.append(&result)?;
                    if let Some(forwarder) = &self.forwarder {
                        forwarder.enqueue(result.clone());
                    }
                    self.feed.push(result);
                    scored += 1;
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("Inference failed for {}: {}", record.uid, e);
                }
            }
        }

        // Durable sink first, offsets second.
        self.csv.flush()?;
        self.tailer.checkpoint(&mut self.store);
        self.store.commit()?;

        self.aggregator.evict_idle();

        let mut status = self.status.write();
        status.last_cycle = Some(Utc::now());
        status.records_scored += scored;
        status.attacks += attacks;
        status.aux_records += aux_count;
        status.malformed_lines += malformed;
        status.inference_failures += failures;
        status.active_window_keys = self.aggregator.active_keys();
        status.sources = self
            .tailer
            .sources()
            .iter()
            .map(|s| SourceStatus {
                path: s.path().to_path_buf(),
                kind: s.kind().as_str().to_string(),
                lag: s.lag(),
            })
            .collect();

        if scored > 0 || malformed > 0 {
            log::info!(
                "Cycle: {} scored ({} attacks), {} aux, {} malformed",
                scored,
                attacks,
                aux_count,
                malformed
            );
        }

        Ok(())
    }
}
