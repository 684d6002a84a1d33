//! Normalized weight sets shared by the continuity detector and the context engine.

use std::fmt::Display;

use crate::error::{CoreError, Result};

/// Allowed deviation of a weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f32 = 0.01;

/// A validated set of weights keyed by `K` that sums to 1.0 (within tolerance).
///
/// Order of insertion is kept so iteration is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSet<K> {
    weights: Vec<(K, f32)>,
}

impl<K: PartialEq + Display> WeightSet<K> {
    /// Build a weight set, failing if any weight is negative or non-finite, or
    /// if the weights do not sum to 1.0.
    pub fn new(weights: impl IntoIterator<Item = (K, f32)>) -> Result<Self> {
        let mut collected: Vec<(K, f32)> = Vec::new();
        for (key, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::NegativeWeight {
                    key: key.to_string(),
                    value,
                });
            }
            // Later entries for the same key replace earlier ones
            if let Some(existing) = collected.iter_mut().find(|(k, _)| *k == key) {
                existing.1 = value;
            } else {
                collected.push((key, value));
            }
        }

        let sum: f32 = collected.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CoreError::InvalidWeights { sum });
        }

        Ok(Self { weights: collected })
    }

    /// Weight for a key; missing keys weigh 0.0.
    pub fn get(&self, key: &K) -> f32 {
        self.weights
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    /// Weighted sum of per-key scores, clamped to [0, 1]. Keys without a score
    /// contribute nothing.
    pub fn combine(&self, scores: &[(K, f32)]) -> f32 {
        scores
            .iter()
            .map(|(key, score)| self.get(key) * score)
            .sum::<f32>()
            .clamp(0.0, 1.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f32)> {
        self.weights.iter().map(|(k, w)| (k, *w))
    }

    pub fn total(&self) -> f32 {
        self.weights.iter().map(|(_, w)| w).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_weights() {
        let set = WeightSet::new([("a", 0.5), ("b", 0.3), ("c", 0.2)]).unwrap();
        assert!((set.get(&"b") - 0.3).abs() < 0.001);
        assert_eq!(set.get(&"missing"), 0.0);
    }

    #[test]
    fn test_tolerance() {
        assert!(WeightSet::new([("a", 0.5), ("b", 0.505)]).is_ok());
        assert!(WeightSet::new([("a", 0.5), ("b", 0.52)]).is_err());
    }

    #[test]
    fn test_rejects_bad_sum() {
        let err = WeightSet::new([("a", 0.5), ("b", 0.5), ("c", 0.5)]).unwrap_err();
        assert!(err.to_string().contains("must sum to 1.0"));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let err = WeightSet::new([("a", 1.5), ("b", -0.5)]).unwrap_err();
        assert!(matches!(err, CoreError::NegativeWeight { .. }));
    }

    #[test]
    fn test_combine_is_clamped_weighted_sum() {
        let set = WeightSet::new([("a", 0.75), ("b", 0.25)]).unwrap();

        let score = set.combine(&[("a", 1.0), ("b", 0.0)]);
        assert!((score - 0.75).abs() < 0.001);

        let over = set.combine(&[("a", 3.0), ("b", 3.0)]);
        assert_eq!(over, 1.0);
    }
}
