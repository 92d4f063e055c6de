//! Output Sinks
//!
//! Every scored record fans out to the CSV sink and the in-memory live
//! feed; the Elasticsearch forwarder is optional and never blocks the
//! scoring path.

pub mod csv;
pub mod elastic;
pub mod feed;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::decoder::ConnRecord;
use crate::logic::features::FeatureVector;
use crate::logic::model::{Label, Prediction};

pub use csv::CsvSink;
pub use elastic::ElasticForwarder;
pub use feed::{FeedStats, LiveFeed};

/// One scored connection, everything a sink might need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub id: Uuid,
    /// Record timestamp from the conn log, epoch seconds
    pub ts: f64,
    pub uid: String,
    pub orig_h: String,
    pub orig_p: Option<u16>,
    pub resp_h: String,
    pub resp_p: Option<u16>,
    pub proto: Option<String>,
    pub service: Option<String>,
    pub conn_state: Option<String>,
    pub features: FeatureVector,
    pub probability: f32,
    pub label: Label,
    /// Aggregated outside the lateness bound
    pub late: bool,
}

impl ClassificationResult {
    pub fn new(
        record: &ConnRecord,
        features: FeatureVector,
        prediction: &Prediction,
        late: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: record.ts,
            uid: record.uid.clone(),
            orig_h: record.orig_h.clone(),
            orig_p: record.orig_p,
            resp_h: record.resp_h.clone(),
            resp_p: record.resp_p,
            proto: record.proto.clone(),
            service: record.service.clone(),
            conn_state: record.conn_state.clone(),
            features,
            probability: prediction.probability,
            label: prediction.label,
            late,
        }
    }

    pub fn is_attack(&self) -> bool {
        self.label == Label::Attack
    }
}
