//! Detection threshold

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_THRESHOLD;

/// Fixed decision threshold over the model's attack probability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Probability at or above which a record is labeled an attack
    pub threshold: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn is_attack(&self, probability: f32) -> bool {
        probability >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_decision_is_inclusive() {
        let t = ThresholdConfig::new(0.5);
        assert!(t.is_attack(0.5));
        assert!(t.is_attack(0.9));
        assert!(!t.is_attack(0.49));
    }

    #[test]
    fn test_threshold_clamped_to_unit_interval() {
        assert_eq!(ThresholdConfig::new(1.5).threshold, 1.0);
        assert_eq!(ThresholdConfig::new(-0.2).threshold, 0.0);
    }
}
