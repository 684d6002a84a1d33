//! Relevance conversion and cross-strategy ranking.

use std::collections::HashSet;

use super::{ContextItem, Strategy};
use crate::knowledge_base::DistanceMetric;
use crate::weights::WeightSet;

/// Convert a raw knowledge-base score into a relevance in [0, 1].
///
/// Similarity metrics are already bounded and are only clamped. Euclidean
/// distances decay as `exp(-d^2 / 2)`: near matches score close to 1.0 and
/// distant matches approach 0.0.
pub fn distance_to_relevance(raw: f32, metric: DistanceMetric) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }

    let relevance = match metric {
        DistanceMetric::Cosine | DistanceMetric::InnerProduct => raw,
        DistanceMetric::Euclidean => (-(raw * raw) / 2.0).exp(),
    };
    relevance.clamp(0.0, 1.0)
}

/// Rank candidates gathered across strategies.
///
/// Candidates arrive in strategy-priority order. For each one:
/// 1. A document already seen earlier is dropped (first occurrence wins)
/// 2. `final_score = relevance * strategy weight`
/// 3. Scores below `min_relevance` are dropped
///
/// Survivors are sorted by final score (descending, stable) and truncated to
/// `top_k`. Each survivor's relevance is overwritten with its final score.
pub fn rank_candidates(
    candidates: Vec<(Strategy, ContextItem)>,
    weights: &WeightSet<Strategy>,
    top_k: usize,
    min_relevance: f32,
) -> Vec<ContextItem> {
    let mut seen = HashSet::new();
    let mut ranked = Vec::new();

    for (strategy, mut item) in candidates {
        if let Some(id) = item.document_id() {
            if !seen.insert(id) {
                continue;
            }
        }

        let final_score = (item.relevance_score * weights.get(&strategy)).clamp(0.0, 1.0);
        if final_score < min_relevance {
            continue;
        }

        item.relevance_score = final_score;
        ranked.push(item);
    }

    ranked.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(top_k);
    ranked
}
