//! Elasticsearch Forwarder
//!
//! Optional export of scored records to an Elasticsearch bulk endpoint.
//! Verdicts are queued from the scoring thread and shipped by a
//! dedicated background thread, so a slow or unreachable cluster never
//! stalls the pipeline. Failed batches are retried a bounded number of
//! times and then dropped with a warning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;

use crate::logic::config::ElasticConfig;

use super::ClassificationResult;

/// Queue bound; oldest entries are dropped past this.
const MAX_PENDING: usize = 50_000;

/// Attempts per batch before it is dropped.
const MAX_RETRIES: u32 = 3;

/// Seconds between ship attempts when the queue is quiet.
const FLUSH_INTERVAL_SECS: u64 = 5;

pub struct ElasticForwarder {
    pending: Arc<Mutex<Vec<ClassificationResult>>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
    dropped: Arc<Mutex<u64>>,
}

impl ElasticForwarder {
    /// Spawn the background shipper thread.
    pub fn start(config: ElasticConfig) -> Self {
        let pending: Arc<Mutex<Vec<ClassificationResult>>> = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(Mutex::new(0u64));

        log::info!(
            "Elasticsearch forwarder: {} index {} batch {}",
            config.url,
            config.index,
            config.batch_size
        );

        let queue = Arc::clone(&pending);
        let stop = Arc::clone(&shutdown);
        let drop_counter = Arc::clone(&dropped);
        let handle = std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Elasticsearch forwarder runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                ship_loop(config, queue, stop, drop_counter).await;
            });
        });

        Self {
            pending,
            shutdown,
            handle: Some(handle),
            dropped,
        }
    }

    #[cfg(test)]
    fn detached() -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            handle: None,
            dropped: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue one verdict. Never blocks on the network.
    pub fn enqueue(&self, result: ClassificationResult) {
        let mut pending = self.pending.lock();
        if pending.len() >= MAX_PENDING {
            pending.remove(0);
            *self.dropped.lock() += 1;
        }
        pending.push(result);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn dropped_count(&self) -> u64 {
        *self.dropped.lock()
    }

    /// Signal the shipper to drain and exit, then join it.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

async fn ship_loop(
    config: ElasticConfig,
    pending: Arc<Mutex<Vec<ClassificationResult>>>,
    shutdown: Arc<AtomicBool>,
    dropped: Arc<Mutex<u64>>,
) {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("Elasticsearch client build failed: {}", e);
            return;
        }
    };

    loop {
        let stopping = shutdown.load(Ordering::SeqCst);

        let batch: Vec<ClassificationResult> = {
            let mut queue = pending.lock();
            if queue.is_empty() {
                Vec::new()
            } else {
                let take = queue.len().min(config.batch_size);
                queue.drain(..take).collect()
            }
        };

        if !batch.is_empty() {
            if !ship_batch(&client, &config, &batch).await {
                *dropped.lock() += batch.len() as u64;
                log::warn!(
                    "Elasticsearch batch of {} dropped after {} attempts",
                    batch.len(),
                    MAX_RETRIES
                );
            }
        } else if stopping {
            break;
        } else {
            tokio::time::sleep(Duration::from_secs(FLUSH_INTERVAL_SECS)).await;
        }

        if stopping && pending.lock().is_empty() {
            break;
        }
    }

    log::info!("Elasticsearch forwarder stopped");
}

/// One bulk request with bounded retries. Returns false when the batch
/// is given up on.
async fn ship_batch(
    client: &reqwest::Client,
    config: &ElasticConfig,
    batch: &[ClassificationResult],
) -> bool {
    let body = bulk_body(&config.index, batch);
    let url = format!("{}/_bulk", config.url.trim_end_matches('/'));

    for attempt in 1..=MAX_RETRIES {
        let mut request = client
            .post(&url)
            .header("Content-Type", "application/x-ndjson")
            .body(body.clone());
        if let Some(key) = &config.api_key {
            request = request.header("Authorization", format!("ApiKey {}", key));
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                log::debug!("Shipped {} docs to {}", batch.len(), config.index);
                return true;
            }
            Ok(resp) => {
                log::warn!(
                    "Elasticsearch bulk attempt {}/{} failed: HTTP {}",
                    attempt,
                    MAX_RETRIES,
                    resp.status()
                );
            }
            Err(e) => {
                log::warn!(
                    "Elasticsearch bulk attempt {}/{} failed: {}",
                    attempt,
                    MAX_RETRIES,
                    e
                );
            }
        }

        if attempt < MAX_RETRIES {
            tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
        }
    }

    false
}

/// NDJSON bulk body: action line then document line, per record.
fn bulk_body(index: &str, batch: &[ClassificationResult]) -> String {
    let sensor = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let mut body = String::with_capacity(batch.len() * 512);
    for result in batch {
        body.push_str(&json!({"index": {"_index": index, "_id": result.id}}).to_string());
        body.push('\n');
        body.push_str(&document(result, &sensor).to_string());
        body.push('\n');
    }
    body
}

fn document(result: &ClassificationResult, sensor: &str) -> serde_json::Value {
    let secs = result.ts.trunc() as i64;
    let nanos = ((result.ts.fract()) * 1e9) as u32;
    let timestamp = Utc
        .timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_else(Utc::now);

    let mut doc = json!({
        "@timestamp": timestamp.to_rfc3339(),
        "sensor": sensor,
        "uid": result.uid,
        "source": {"ip": result.orig_h, "port": result.orig_p},
        "destination": {"ip": result.resp_h, "port": result.resp_p},
        "network": {"transport": result.proto, "protocol": result.service},
        "conn_state": result.conn_state,
        "conn_state_description": result.conn_state.as_deref().map(conn_state_description),
        "prediction": {
            "probability": result.probability,
            "label": result.label.as_str(),
            "late": result.late,
        },
        "feature_version": result.features.version,
    });

    if let serde_json::Value::Object(map) = &mut doc {
        let features: serde_json::Map<String, serde_json::Value> = result
            .features
            .named_values()
            .map(|(name, value)| (name.to_string(), json!(value)))
            .collect();
        map.insert("features".to_string(), serde_json::Value::Object(features));
    }

    doc
}

fn conn_state_description(state: &str) -> &'static str {
    match state {
        "S0" => "Connection attempt seen, no reply",
        "S1" => "Connection established, not terminated",
        "SF" => "Normal establishment and termination",
        "REJ" => "Connection attempt rejected",
        "S2" => "Established, close attempt by originator only",
        "S3" => "Established, close attempt by responder only",
        "RSTO" => "Established, originator aborted",
        "RSTR" => "Established, responder aborted",
        "RSTOS0" => "Originator sent SYN then RST, no responder SYN-ACK",
        "RSTRH" => "Responder sent SYN-ACK then RST, no originator SYN",
        "SH" => "Originator sent SYN then FIN, no responder SYN-ACK",
        "SHR" => "Responder sent SYN-ACK then FIN, no originator SYN",
        _ => "Other or midstream traffic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::decoder::ConnRecord;
    use crate::logic::features::{FeatureVector, FEATURE_COUNT};
    use crate::logic::model::{Label, Prediction};

    fn result() -> ClassificationResult {
        let record = ConnRecord {
            ts: 1700000000.25,
            uid: "Cxyz".into(),
            orig_h: "192.168.1.2".into(),
            orig_p: Some(1234),
            resp_h: "10.0.0.9".into(),
            resp_p: Some(443),
            proto: Some("tcp".into()),
            service: Some("https".into()),
            duration: None,
            orig_bytes: None,
            resp_bytes: None,
            conn_state: Some("REJ".into()),
            missed_bytes: None,
            history: None,
            orig_pkts: None,
            resp_pkts: None,
        };
        let prediction = Prediction {
            probability: 0.91,
            label: Label::Attack,
            inference_time_us: 50,
        };
        ClassificationResult::new(
            &record,
            FeatureVector::from_values([0.0; FEATURE_COUNT]),
            &prediction,
            true,
        )
    }

    #[test]
    fn test_bulk_body_pairs_action_and_doc_lines() {
        let body = bulk_body("zeek-ids-analytics", &[result(), result()]);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("\"_index\":\"zeek-ids-analytics\""));
        let doc: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["prediction"]["label"], "attack");
        assert_eq!(doc["prediction"]["late"], true);
        assert_eq!(
            doc["conn_state_description"],
            "Connection attempt rejected"
        );
        assert!(doc["features"]["duration"].is_number());
    }

    #[test]
    fn test_document_timestamp_from_record_ts() {
        let doc = document(&result(), "sensor-1");
        let ts = doc["@timestamp"].as_str().unwrap();
        assert!(ts.starts_with("2023-11-14T22:13:20"));
        assert_eq!(doc["sensor"], "sensor-1");
    }

    #[test]
    fn test_queue_bound_drops_oldest() {
        let forwarder = ElasticForwarder::detached();
        for _ in 0..(MAX_PENDING + 10) {
            forwarder.enqueue(result());
        }
        assert_eq!(forwarder.pending_count(), MAX_PENDING);
        assert_eq!(forwarder.dropped_count(), 10);
    }
}
