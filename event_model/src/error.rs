//! Errors raised while decoding events handed over by the perception layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("{field} confidence {value} is outside [0, 1]")]
    InvalidConfidence { field: String, value: f32 },

    #[error("Malformed event payload: {0}")]
    Json(#[from] serde_json::Error),
}
