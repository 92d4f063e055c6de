//! NSL-KDD Feature Encoding
//!
//! Versioned vector layout, categorical vocabularies, and the encoder
//! that turns a conn record plus its window snapshot into a model-ready
//! feature vector.

pub mod encode;
pub mod layout;
pub mod vector;
pub mod vocab;

#[cfg(test)]
mod tests;

pub use encode::encode;
pub use layout::{layout_hash, validate_layout, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::FeatureVector;
