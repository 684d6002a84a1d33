//! Error types for the reasoning substrate.
//!
//! Two families live here:
//! - **Validation** errors: bad weights, out-of-range confidences, pass
//!   lifecycle misuse. Raised at construction or mutation time and never retried.
//! - **Data-integrity** errors: floating timestamps or out-of-order event pairs
//!   reaching the continuity detector. These point at an upstream bug.
//!
//! Knowledge-base failures have their own type and are never surfaced from
//! context retrieval; the engine logs them and degrades.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Weights must sum to 1.0 (got {sum:.3})")]
    InvalidWeights { sum: f32 },

    #[error("Weight for {key} must be finite and non-negative (got {value})")]
    NegativeWeight { key: String, value: f32 },

    #[error("Confidence must be within [0, 1] (got {0})")]
    ConfidenceOutOfRange(f32),

    #[error("Reasoning pass {0} is still active")]
    PassAlreadyActive(u32),

    #[error("No reasoning pass is active")]
    NoActivePass,

    #[error("Invalid memory state transition: {0}")]
    InvalidState(String),

    #[error("Event {event} has a timestamp without timezone information")]
    NaiveTimestamp { event: String },

    #[error("Event {current} occurred before the event it follows ({previous})")]
    OutOfOrderEvents { current: String, previous: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True for errors caused by corrupted upstream data rather than by the caller.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::NaiveTimestamp { .. } | Self::OutOfOrderEvents { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure reported by a knowledge-base collaborator.
#[derive(Debug, Clone, Error)]
pub enum KnowledgeBaseError {
    #[error("Knowledge base unavailable: {0}")]
    Unavailable(String),

    #[error("Knowledge base query failed: {0}")]
    Query(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_error_message() {
        let err = CoreError::InvalidWeights { sum: 1.5 };
        assert!(err.to_string().contains("must sum to 1.0"));
    }

    #[test]
    fn test_data_integrity_classification() {
        let naive = CoreError::NaiveTimestamp {
            event: "msg-1".into(),
        };
        assert!(naive.is_data_integrity());
        assert!(!CoreError::NoActivePass.is_data_integrity());
        assert!(!CoreError::ConfidenceOutOfRange(1.5).is_data_integrity());
    }
}
