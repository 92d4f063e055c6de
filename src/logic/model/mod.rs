//! Model Scoring
//!
//! ONNX session lifecycle, schema verification, and the fixed decision
//! threshold.

pub mod inference;
pub mod threshold;

pub use inference::{EngineStatus, Label, Prediction, Scorer};
pub use threshold::ThresholdConfig;
