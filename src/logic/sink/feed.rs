//! Live Feed
//!
//! Bounded in-memory ring of the most recent verdicts plus running
//! aggregate stats, shared read-mostly with the status surface.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_FEED_CAPACITY;

use super::ClassificationResult;

/// Aggregate counters over everything the feed has ever seen, not just
/// the retained window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeedStats {
    pub total: u64,
    pub attacks: u64,
    pub attack_rate: f32,
    pub avg_confidence: f32,
}

struct FeedInner {
    recent: VecDeque<ClassificationResult>,
    capacity: usize,
    total: u64,
    attacks: u64,
    confidence_sum: f64,
}

#[derive(Clone)]
pub struct LiveFeed {
    inner: Arc<RwLock<FeedInner>>,
}

impl LiveFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FeedInner {
                recent: VecDeque::with_capacity(capacity.max(1)),
                capacity: capacity.max(1),
                total: 0,
                attacks: 0,
                confidence_sum: 0.0,
            })),
        }
    }

    pub fn push(&self, result: ClassificationResult) {
        let mut inner = self.inner.write();
        inner.total += 1;
        if result.is_attack() {
            inner.attacks += 1;
        }
        inner.confidence_sum += result.probability as f64;
        if inner.recent.len() >= inner.capacity {
            inner.recent.pop_front();
        }
        inner.recent.push_back(result);
    }

    /// Most recent verdicts, newest last. Cloned out so the lock is
    /// held only for the copy.
    pub fn recent(&self, limit: usize) -> Vec<ClassificationResult> {
        let inner = self.inner.read();
        let skip = inner.recent.len().saturating_sub(limit);
        inner.recent.iter().skip(skip).cloned().collect()
    }

    pub fn stats(&self) -> FeedStats {
        let inner = self.inner.read();
        let total = inner.total;
        FeedStats {
            total,
            attacks: inner.attacks,
            attack_rate: if total > 0 {
                inner.attacks as f32 / total as f32
            } else {
                0.0
            },
            avg_confidence: if total > 0 {
                (inner.confidence_sum / total as f64) as f32
            } else {
                0.0
            },
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().recent.is_empty()
    }
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::decoder::ConnRecord;
    use crate::logic::features::{FeatureVector, FEATURE_COUNT};
    use crate::logic::model::{Label, Prediction};

    fn result(probability: f32, label: Label) -> ClassificationResult {
        let record = ConnRecord {
            ts: 1.0,
            uid: "C1".into(),
            orig_h: "a".into(),
            orig_p: None,
            resp_h: "b".into(),
            resp_p: None,
            proto: None,
            service: None,
            duration: None,
            orig_bytes: None,
            resp_bytes: None,
            conn_state: None,
            missed_bytes: None,
            history: None,
            orig_pkts: None,
            resp_pkts: None,
        };
        let prediction = Prediction {
            probability,
            label,
            inference_time_us: 10,
        };
        ClassificationResult::new(
            &record,
            FeatureVector::from_values([0.0; FEATURE_COUNT]),
            &prediction,
            false,
        )
    }

    #[test]
    fn test_feed_capacity_bounded() {
        let feed = LiveFeed::new(3);
        for i in 0..10 {
            feed.push(result(i as f32 / 10.0, Label::Normal));
        }
        assert_eq!(feed.len(), 3);
        assert_eq!(feed.stats().total, 10);
    }

    #[test]
    fn test_stats_track_attack_rate() {
        let feed = LiveFeed::new(10);
        feed.push(result(0.9, Label::Attack));
        feed.push(result(0.1, Label::Normal));
        feed.push(result(0.8, Label::Attack));
        feed.push(result(0.2, Label::Normal));

        let stats = feed.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.attacks, 2);
        assert!((stats.attack_rate - 0.5).abs() < 1e-6);
        assert!((stats.avg_confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_recent_returns_newest() {
        let feed = LiveFeed::new(5);
        for i in 0..5 {
            feed.push(result(i as f32 / 10.0, Label::Normal));
        }
        let last_two = feed.recent(2);
        assert_eq!(last_two.len(), 2);
        assert!((last_two[1].probability - 0.4).abs() < 1e-6);
    }
}
