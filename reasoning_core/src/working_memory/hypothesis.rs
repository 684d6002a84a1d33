//! Hypotheses - candidate interpretations of an event.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A candidate interpretation of what an event means or requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Unique within one working memory.
    pub id: String,
    pub description: String,

    confidence: f32,

    pub supporting_evidence: Vec<String>,
    pub contradicting_evidence: Vec<String>,
}

impl Hypothesis {
    /// Create a hypothesis. Fails if `confidence` is outside [0, 1].
    pub fn new(id: impl Into<String>, description: impl Into<String>, confidence: f32) -> Result<Self> {
        check_confidence(confidence)?;
        Ok(Self {
            id: id.into(),
            description: description.into(),
            confidence,
            supporting_evidence: Vec::new(),
            contradicting_evidence: Vec::new(),
        })
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn set_confidence(&mut self, confidence: f32) -> Result<()> {
        check_confidence(confidence)?;
        self.confidence = confidence;
        Ok(())
    }

    /// Add supporting evidence unless already recorded.
    pub fn add_supporting_evidence(&mut self, evidence: impl Into<String>) -> bool {
        push_unique(&mut self.supporting_evidence, evidence.into())
    }

    /// Add contradicting evidence unless already recorded.
    pub fn add_contradicting_evidence(&mut self, evidence: impl Into<String>) -> bool {
        push_unique(&mut self.contradicting_evidence, evidence.into())
    }

    pub fn with_supporting_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.add_supporting_evidence(evidence);
        self
    }

    pub fn with_contradicting_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.add_contradicting_evidence(evidence);
        self
    }

    /// Supporting minus contradicting evidence count.
    pub fn net_evidence(&self) -> i64 {
        self.supporting_evidence.len() as i64 - self.contradicting_evidence.len() as i64
    }
}

pub(crate) fn check_confidence(confidence: f32) -> Result<()> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(CoreError::ConfidenceOutOfRange(confidence))
    }
}

pub(crate) fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        false
    } else {
        list.push(value);
        true
    }
}
