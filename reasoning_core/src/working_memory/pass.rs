//! Reasoning passes - bounded iterations of the confidence-refinement loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a pass set out to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassType {
    /// First interpretation of the raw event.
    Initial,
    /// Pull supporting context and re-evaluate.
    ContextGathering,
    /// Adjust hypotheses against accumulated evidence.
    Refinement,
    /// Check the leading hypothesis for contradictions.
    Validation,
}

/// A pass that has been started but not completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePass {
    pub pass_number: u32,
    pub pass_type: PassType,
    pub input_confidence: f32,
    pub input_hypothesis_count: usize,
    pub started_at: DateTime<Utc>,
    pub insights: Vec<String>,
    pub questions_raised: Vec<String>,
}

/// A completed pass. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPass {
    pub pass_number: u32,
    pub pass_type: PassType,

    pub input_confidence: f32,
    pub output_confidence: f32,
    pub input_hypothesis_count: usize,
    pub output_hypothesis_count: usize,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    pub insights: Vec<String>,
    pub questions_raised: Vec<String>,
}

impl ActivePass {
    pub(crate) fn open(
        pass_number: u32,
        pass_type: PassType,
        input_confidence: f32,
        input_hypothesis_count: usize,
    ) -> Self {
        Self {
            pass_number,
            pass_type,
            input_confidence,
            input_hypothesis_count,
            started_at: Utc::now(),
            insights: Vec::new(),
            questions_raised: Vec::new(),
        }
    }

    /// Close the pass with its output snapshot.
    pub(crate) fn close(self, output_confidence: f32, output_hypothesis_count: usize) -> ReasoningPass {
        let completed_at = Utc::now().max(self.started_at);
        ReasoningPass {
            pass_number: self.pass_number,
            pass_type: self.pass_type,
            input_confidence: self.input_confidence,
            output_confidence,
            input_hypothesis_count: self.input_hypothesis_count,
            output_hypothesis_count,
            started_at: self.started_at,
            completed_at,
            insights: self.insights,
            questions_raised: self.questions_raised,
        }
    }
}

impl ReasoningPass {
    /// Confidence gained (or lost) during the pass.
    pub fn confidence_delta(&self) -> f32 {
        self.output_confidence - self.input_confidence
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// Hypotheses added during the pass.
    pub fn hypotheses_added(&self) -> i64 {
        self.output_hypothesis_count as i64 - self.input_hypothesis_count as i64
    }
}
