//! Error handling
//!
//! Startup errors are fatal and refuse to run the pipeline; everything
//! else (transient I/O, malformed lines, per-record inference failures)
//! is counted and skipped by the caller.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid startup parameter. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Model artifact missing or unusable. Fatal.
    #[error("model error: {0}")]
    Model(String),

    /// Encoder output shape does not match the loaded model. Fatal.
    #[error("schema mismatch: model expects {expected} features, encoder produces {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// Transient file or sink I/O. Retried with backoff, never fatal.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// One scoring call failed. Counted and skipped per record.
    #[error("inference error: {0}")]
    Inference(String),
}
