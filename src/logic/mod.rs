//! Logic Module - Pipeline Stages
//!
//! The stages between a Zeek log directory and a classified verdict:
//! - `tailer/` - poll-based log tailing with offset persistence
//! - `decoder/` - TSV decoding and uid-keyed enrichment
//! - `window/` - sliding-window traffic aggregation
//! - `features/` - NSL-KDD feature encoding
//! - `model/` - ONNX scoring
//! - `sink/` - CSV, live feed, Elasticsearch outputs
//! - `pipeline` - the orchestrator tying them together

pub mod config;
pub mod decoder;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod sink;
pub mod tailer;
pub mod window;
