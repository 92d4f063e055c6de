//! Versioned feature vector

use serde::{Deserialize, Serialize};

use super::layout::{
    layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT,
    FEATURE_VERSION,
};

/// The encoder's output: values in `FEATURE_LAYOUT` order, stamped with
/// the layout version and hash they were produced under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub version: u8,
    pub layout_hash: u32,
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        super::layout::feature_index(name).map(|i| self.values[i])
    }

    /// Name/value pairs in layout order (CSV rows, ES documents).
    pub fn named_values(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_LAYOUT.iter().copied().zip(self.values.iter().copied())
    }

    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::from_values([0.0; FEATURE_COUNT])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_carries_current_layout() {
        let v = FeatureVector::default();
        assert_eq!(v.version, FEATURE_VERSION);
        assert_eq!(v.layout_hash, layout_hash());
        assert!(v.validate().is_ok());
    }

    #[test]
    fn test_named_values_order_matches_layout() {
        let mut values = [0.0; FEATURE_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as f32;
        }
        let vector = FeatureVector::from_values(values);
        for (i, (name, value)) in vector.named_values().enumerate() {
            assert_eq!(name, FEATURE_LAYOUT[i]);
            assert_eq!(value, i as f32);
        }
    }

    #[test]
    fn test_get_by_name() {
        let mut values = [0.0; FEATURE_COUNT];
        values[0] = 1.5;
        let v = FeatureVector::from_values(values);
        assert_eq!(v.get_by_name("duration"), Some(1.5));
        assert_eq!(v.get_by_name("bogus"), None);
    }
}
