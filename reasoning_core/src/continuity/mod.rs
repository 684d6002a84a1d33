//! Continuity Detector - decides whether a new event continues a prior conversation.
//!
//! Two kinds of evidence are weighed:
//! 1. **Explicit**: a shared thread identifier, or the new event replying to the
//!    previous one. Either settles the question with a score of 1.0.
//! 2. **Implicit**: time proximity, participant overlap, topic similarity and
//!    entity overlap, fused by a validated weight set.
//!
//! The orchestrator uses the verdict to decide whether a fresh working memory
//! should carry forward the prior conversation's state.

pub mod similarity;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use event_model::{EntityType, PerceivedEvent};

use crate::config::ContinuityConfig;
use crate::error::{CoreError, Result};
use crate::weights::WeightSet;
use similarity::{best_pairwise_ratio, jaccard, string_ratio};

/// The four implicit signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContinuitySignal {
    TimeProximity,
    ParticipantOverlap,
    TopicSimilarity,
    EntityOverlap,
}

impl std::fmt::Display for ContinuitySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContinuitySignal::TimeProximity => "time_proximity",
            ContinuitySignal::ParticipantOverlap => "participant_overlap",
            ContinuitySignal::TopicSimilarity => "topic_similarity",
            ContinuitySignal::EntityOverlap => "entity_overlap",
        };
        f.write_str(name)
    }
}

/// Outcome of comparing an event with its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityScore {
    pub overall_score: f32,
    pub is_continuous: bool,

    pub explicit_thread_match: bool,
    pub is_reply: bool,

    pub time_proximity_score: f32,
    pub participant_overlap_score: f32,
    pub topic_similarity_score: f32,
    pub entity_overlap_score: f32,
}

impl ContinuityScore {
    /// Score for an event with no history to compare against.
    pub fn none() -> Self {
        Self {
            overall_score: 0.0,
            is_continuous: false,
            explicit_thread_match: false,
            is_reply: false,
            time_proximity_score: 0.0,
            participant_overlap_score: 0.0,
            topic_similarity_score: 0.0,
            entity_overlap_score: 0.0,
        }
    }

    /// True if a thread match or reply link decided the score.
    pub fn is_explicit(&self) -> bool {
        self.explicit_thread_match || self.is_reply
    }
}

/// Compares events pairwise to detect conversational continuity.
#[derive(Debug, Clone)]
pub struct ContinuityDetector {
    weights: WeightSet<ContinuitySignal>,
    continuity_threshold: f32,
    quick_reply_hours: f64,
    max_time_gap_hours: f64,
}

impl ContinuityDetector {
    /// Create a detector, validating weights and thresholds.
    pub fn new(config: ContinuityConfig) -> Result<Self> {
        let weights = config.weights.to_weight_set()?;
        config.validate_thresholds()?;

        Ok(Self {
            weights,
            continuity_threshold: config.continuity_threshold,
            quick_reply_hours: config.quick_reply_hours,
            max_time_gap_hours: config.max_time_gap_hours,
        })
    }

    pub fn continuity_threshold(&self) -> f32 {
        self.continuity_threshold
    }

    /// Compare `current` with the most recent prior event.
    ///
    /// `previous_events` is most-recent-first; only the first entry is used.
    /// An empty history scores 0.0.
    pub fn detect_continuity(
        &self,
        current: &PerceivedEvent,
        previous_events: &[PerceivedEvent],
    ) -> Result<ContinuityScore> {
        match previous_events.first() {
            Some(previous) => self.score_pair(current, previous),
            None => Ok(ContinuityScore::none()),
        }
    }

    /// Score one (current, previous) pair.
    pub fn score_pair(
        &self,
        current: &PerceivedEvent,
        previous: &PerceivedEvent,
    ) -> Result<ContinuityScore> {
        let explicit_thread_match = match (current.thread_id(), previous.thread_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        let is_reply = current
            .in_reply_to
            .as_deref()
            .is_some_and(|reply_to| reply_to == previous.source_id);

        let time_proximity_score = self.time_proximity(current, previous)?;
        let participant_overlap_score = jaccard(&current.participants(), &previous.participants());
        let topic_similarity_score = topic_similarity(current, previous);
        let entity_overlap_score = entity_overlap(current, previous);

        let overall_score = if explicit_thread_match || is_reply {
            1.0
        } else {
            self.weights.combine(&[
                (ContinuitySignal::TimeProximity, time_proximity_score),
                (ContinuitySignal::ParticipantOverlap, participant_overlap_score),
                (ContinuitySignal::TopicSimilarity, topic_similarity_score),
                (ContinuitySignal::EntityOverlap, entity_overlap_score),
            ])
        };

        let score = ContinuityScore {
            overall_score,
            is_continuous: overall_score >= self.continuity_threshold,
            explicit_thread_match,
            is_reply,
            time_proximity_score,
            participant_overlap_score,
            topic_similarity_score,
            entity_overlap_score,
        };

        debug!(
            current = %current.source_id,
            previous = %previous.source_id,
            score = score.overall_score,
            continuous = score.is_continuous,
            "Continuity scored"
        );

        Ok(score)
    }

    /// Time proximity in [0, 1].
    ///
    /// Gaps up to `quick_reply_hours` score 1.0, gaps beyond
    /// `max_time_gap_hours` score 0.0, and gaps in between decay linearly.
    /// Floating timestamps and a current event that precedes the previous one
    /// are data-integrity errors.
    pub fn time_proximity(&self, current: &PerceivedEvent, previous: &PerceivedEvent) -> Result<f32> {
        let current_at = current
            .occurred_at
            .to_utc()
            .ok_or_else(|| CoreError::NaiveTimestamp {
                event: current.source_id.clone(),
            })?;
        let previous_at = previous
            .occurred_at
            .to_utc()
            .ok_or_else(|| CoreError::NaiveTimestamp {
                event: previous.source_id.clone(),
            })?;

        if current_at < previous_at {
            return Err(CoreError::OutOfOrderEvents {
                current: current.source_id.clone(),
                previous: previous.source_id.clone(),
            });
        }

        let gap_hours = (current_at - previous_at).num_milliseconds() as f64 / 3_600_000.0;

        let score = if gap_hours <= self.quick_reply_hours {
            1.0
        } else if gap_hours > self.max_time_gap_hours {
            0.0
        } else {
            let span = self.max_time_gap_hours - self.quick_reply_hours;
            1.0 - (gap_hours - self.quick_reply_hours) / span
        };

        Ok((score as f32).clamp(0.0, 1.0))
    }

    /// Walk backwards from `current` through continuous predecessors.
    ///
    /// Each hop scans every event strictly earlier than the anchor and keeps
    /// the latest one that scores as continuous. The walk stops after
    /// `max_depth` hops or when no predecessor qualifies. The chain is
    /// returned oldest first.
    ///
    /// Cost is O(max_depth * all_events.len()); meant for short recent-history
    /// windows.
    pub fn find_conversation_chain<'a>(
        &self,
        current: &PerceivedEvent,
        all_events: &'a [PerceivedEvent],
        max_depth: usize,
    ) -> Result<Vec<&'a PerceivedEvent>> {
        let mut chain: Vec<&'a PerceivedEvent> = Vec::new();
        let mut anchor = current;

        for _depth in 0..max_depth {
            let anchor_at = anchor
                .occurred_at
                .to_utc()
                .ok_or_else(|| CoreError::NaiveTimestamp {
                    event: anchor.source_id.clone(),
                })?;

            let mut best: Option<(&'a PerceivedEvent, chrono::DateTime<chrono::Utc>)> = None;

            for candidate in all_events {
                if candidate.event_id == anchor.event_id || candidate.event_id == current.event_id {
                    continue;
                }
                let candidate_at =
                    candidate
                        .occurred_at
                        .to_utc()
                        .ok_or_else(|| CoreError::NaiveTimestamp {
                            event: candidate.source_id.clone(),
                        })?;
                if candidate_at >= anchor_at {
                    continue;
                }

                if !self.score_pair(anchor, candidate)?.is_continuous {
                    continue;
                }

                // Most recent continuous predecessor wins
                if best.map_or(true, |(_, best_at)| candidate_at > best_at) {
                    best = Some((candidate, candidate_at));
                }
            }

            match best {
                Some((predecessor, _)) => {
                    chain.insert(0, predecessor);
                    anchor = predecessor;
                }
                None => break,
            }
        }

        debug!(
            event = %current.source_id,
            length = chain.len(),
            "Conversation chain resolved"
        );

        Ok(chain)
    }
}

/// Best pairwise topic similarity; falls back to comparing titles when either
/// side has no topics. A blank title on either side scores 0.0.
fn topic_similarity(current: &PerceivedEvent, previous: &PerceivedEvent) -> f32 {
    if !current.topics.is_empty() && !previous.topics.is_empty() {
        return best_pairwise_ratio(&current.topics, &previous.topics);
    }

    if current.title.trim().is_empty() || previous.title.trim().is_empty() {
        return 0.0;
    }
    string_ratio(&current.title, &previous.title)
}

/// Jaccard overlap of (type, lower-cased value) entity keys.
fn entity_overlap(current: &PerceivedEvent, previous: &PerceivedEvent) -> f32 {
    let keys = |event: &PerceivedEvent| -> HashSet<(EntityType, String)> {
        event.entities.iter().map(|e| e.key()).collect()
    };
    jaccard(&keys(current), &keys(previous))
}
