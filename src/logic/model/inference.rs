//! Inference Engine - ONNX Runtime Integration
//!
//! Loads the classifier once at startup and scores one feature vector at
//! a time. A missing model file or a model whose declared input width
//! disagrees with `FEATURE_COUNT` is a startup error; nothing gets
//! scored against the wrong schema.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::{FeatureVector, FEATURE_COUNT};

use super::threshold::ThresholdConfig;

// ============================================================================
// STATE
// ============================================================================

/// Latency stats, microseconds summed across all inferences
static LATENCY_SUM: AtomicU64 = AtomicU64::new(0);
static INFERENCE_COUNT: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Classifier verdict for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Normal,
    Attack,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Attack => "attack",
        }
    }
}

/// One scored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Attack probability in [0, 1]
    pub probability: f32,
    pub label: Label,
    pub inference_time_us: u64,
}

/// Engine status for the status surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_path: String,
    pub input_width: usize,
    pub threshold: f32,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
}

// ============================================================================
// SCORER
// ============================================================================

/// Owns the ONNX session for the lifetime of the pipeline.
#[derive(Debug)]
pub struct Scorer {
    session: Session,
    threshold: ThresholdConfig,
    model_path: String,
    input_width: usize,
}

impl Scorer {
    /// Load the model and verify its input schema. Any failure here is
    /// fatal to startup.
    pub fn load(model_path: &Path, threshold: ThresholdConfig) -> PipelineResult<Self> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(PipelineError::Model(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| PipelineError::Model(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PipelineError::Model(format!("optimization level: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model(format!("load model: {}", e)))?;

        let input_width = declared_input_width(&session).ok_or_else(|| {
            PipelineError::Model("model declares no tensor input".to_string())
        })?;
        check_input_width(input_width)?;

        log::info!(
            "ONNX model loaded, input width {} threshold {}",
            input_width,
            threshold.threshold
        );

        Ok(Self {
            session,
            threshold,
            model_path: model_path.display().to_string(),
            input_width,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold.threshold
    }

    /// Score one vector. Inference errors are per-record: the caller
    /// counts and skips, the pipeline keeps running.
    pub fn score(&mut self, vector: &FeatureVector) -> PipelineResult<Prediction> {
        let start_time = std::time::Instant::now();

        let input_array = Array2::<f32>::from_shape_vec(
            (1, FEATURE_COUNT),
            vector.as_slice().to_vec(),
        )
        .map_err(|e| PipelineError::Inference(format!("array shape: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| PipelineError::Inference(format!("tensor: {}", e)))?;

        let output_name = self
            .session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| PipelineError::Inference("model declares no output".to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| PipelineError::Inference(format!("inference failed: {}", e)))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| PipelineError::Inference("missing output tensor".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Inference(format!("extract: {}", e)))?;

        let probability = attack_probability(data).ok_or_else(|| {
            PipelineError::Inference("empty output tensor".to_string())
        })?;

        let inference_time_us = start_time.elapsed().as_micros() as u64;
        LATENCY_SUM.fetch_add(inference_time_us, Ordering::Relaxed);
        INFERENCE_COUNT.fetch_add(1, Ordering::Relaxed);

        let label = if self.threshold.is_attack(probability) {
            Label::Attack
        } else {
            Label::Normal
        };

        Ok(Prediction {
            probability,
            label,
            inference_time_us,
        })
    }

    pub fn status(&self) -> EngineStatus {
        let sum = LATENCY_SUM.load(Ordering::Relaxed);
        let count = INFERENCE_COUNT.load(Ordering::Relaxed);
        let avg = if count > 0 {
            (sum as f32 / count as f32) / 1000.0
        } else {
            0.0
        };

        EngineStatus {
            model_path: self.model_path.clone(),
            input_width: self.input_width,
            threshold: self.threshold.threshold,
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}

/// Width of the model's first input tensor; 0 when the last dimension is
/// dynamic.
fn declared_input_width(session: &Session) -> Option<usize> {
    let input = session.inputs.first()?;
    match &input.input_type {
        ValueType::Tensor { shape, .. } => {
            let last = *shape.last()?;
            Some(usize::try_from(last).unwrap_or(0))
        }
        _ => None,
    }
}

/// Reject a model trained against a different feature schema before any
/// record is scored. A dynamic last dimension is reported as 0 and
/// accepted.
fn check_input_width(width: usize) -> PipelineResult<()> {
    if width != 0 && width != FEATURE_COUNT {
        return Err(PipelineError::SchemaMismatch {
            expected: FEATURE_COUNT,
            actual: width,
        });
    }
    Ok(())
}

/// Collapse the output tensor into one attack probability.
///
/// Binary classifiers exported from common trainers come in two shapes:
/// a single sigmoid column, or a two-column softmax where column 1 is
/// the attack class.
fn attack_probability(data: &[f32]) -> Option<f32> {
    match data.len() {
        0 => None,
        1 => Some(data[0].clamp(0.0, 1.0)),
        _ => Some(data[1].clamp(0.0, 1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_probability_sigmoid_and_softmax() {
        assert_eq!(attack_probability(&[]), None);
        assert_eq!(attack_probability(&[0.8]), Some(0.8));
        assert_eq!(attack_probability(&[0.3, 0.7]), Some(0.7));
    }

    #[test]
    fn test_attack_probability_clamped() {
        assert_eq!(attack_probability(&[1.2]), Some(1.0));
        assert_eq!(attack_probability(&[-0.1]), Some(0.0));
    }

    #[test]
    fn test_mismatched_input_width_is_fatal() {
        let err = check_input_width(40).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { expected, actual } => {
                assert_eq!(expected, FEATURE_COUNT);
                assert_eq!(actual, 40);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_matching_and_dynamic_widths_accepted() {
        assert!(check_input_width(FEATURE_COUNT).is_ok());
        assert!(check_input_width(0).is_ok());
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let err = Scorer::load(
            Path::new("/nonexistent/model.onnx"),
            ThresholdConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
    }
}
