//! Configuration for the reasoning substrate.
//!
//! Every component takes its configuration by constructor injection; there is
//! no process-wide state. `SubstrateConfig` bundles the sections so an
//! orchestrator can load them from one TOML document:
//!
//! ```toml
//! log_level = "debug"
//!
//! [continuity]
//! continuity_threshold = 0.6
//!
//! [continuity.weights]
//! time_proximity = 0.25
//! participant_overlap = 0.30
//! topic_similarity = 0.25
//! entity_overlap = 0.20
//!
//! [context]
//! entity_weight = 0.4
//! semantic_weight = 0.4
//! thread_weight = 0.2
//! timeout_seconds = 10.0
//!
//! [reasoning]
//! confidence_threshold = 0.85
//! max_passes = 3
//! ```
//!
//! Missing sections and fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::context_engine::Strategy;
use crate::continuity::ContinuitySignal;
use crate::error::{CoreError, Result};
use crate::weights::WeightSet;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstrateConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub continuity: ContinuityConfig,

    #[serde(default)]
    pub context: ContextEngineConfig,

    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

/// Continuity detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuityConfig {
    #[serde(default)]
    pub weights: ContinuityWeights,

    /// Minimum overall score for two events to count as one conversation.
    #[serde(default = "default_continuity_threshold")]
    pub continuity_threshold: f32,

    /// Gaps up to this many hours score full time proximity.
    #[serde(default = "default_quick_reply_hours")]
    pub quick_reply_hours: f64,

    /// Gaps beyond this many hours score zero time proximity.
    #[serde(default = "default_max_time_gap_hours")]
    pub max_time_gap_hours: f64,
}

/// Weights of the four implicit continuity signals. Must sum to 1.0.
///
/// Missing keys keep their default weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuityWeights {
    pub time_proximity: f32,
    pub participant_overlap: f32,
    pub topic_similarity: f32,
    pub entity_overlap: f32,
}

/// Context engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEngineConfig {
    #[serde(default = "default_entity_weight")]
    pub entity_weight: f32,

    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    #[serde(default = "default_thread_weight")]
    pub thread_weight: f32,

    /// Upper bound on raw items considered before ranking.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Wall-clock budget for one retrieval, all strategies included.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    /// Result cap passed to each knowledge-base query.
    #[serde(default = "default_per_query_limit")]
    pub per_query_limit: usize,

    /// Maximum strategies running at once.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

/// Loop parameters the orchestrator feeds to `WorkingMemory::needs_more_reasoning`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_continuity_threshold() -> f32 {
    0.6
}

fn default_quick_reply_hours() -> f64 {
    2.0
}

fn default_max_time_gap_hours() -> f64 {
    24.0
}

fn default_entity_weight() -> f32 {
    0.4
}

fn default_semantic_weight() -> f32 {
    0.4
}

fn default_thread_weight() -> f32 {
    0.2
}

fn default_max_candidates() -> usize {
    200
}

fn default_timeout_seconds() -> f64 {
    10.0
}

fn default_per_query_limit() -> usize {
    20
}

fn default_max_workers() -> usize {
    3
}

fn default_confidence_threshold() -> f32 {
    0.85
}

fn default_max_passes() -> usize {
    3
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            continuity: ContinuityConfig::default(),
            context: ContextEngineConfig::default(),
            reasoning: ReasoningConfig::default(),
        }
    }
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            weights: ContinuityWeights::default(),
            continuity_threshold: default_continuity_threshold(),
            quick_reply_hours: default_quick_reply_hours(),
            max_time_gap_hours: default_max_time_gap_hours(),
        }
    }
}

impl Default for ContinuityWeights {
    fn default() -> Self {
        Self {
            time_proximity: 0.25,
            participant_overlap: 0.30,
            topic_similarity: 0.25,
            entity_overlap: 0.20,
        }
    }
}

impl ContinuityWeights {
    /// Validate into a weight set.
    pub fn to_weight_set(&self) -> Result<WeightSet<ContinuitySignal>> {
        WeightSet::new([
            (ContinuitySignal::TimeProximity, self.time_proximity),
            (ContinuitySignal::ParticipantOverlap, self.participant_overlap),
            (ContinuitySignal::TopicSimilarity, self.topic_similarity),
            (ContinuitySignal::EntityOverlap, self.entity_overlap),
        ])
    }
}

impl ContinuityConfig {
    /// Check thresholds. Weights are checked by `ContinuityWeights::to_weight_set`.
    pub fn validate_thresholds(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.continuity_threshold) {
            return Err(CoreError::Config(format!(
                "continuity_threshold must be within [0, 1] (got {})",
                self.continuity_threshold
            )));
        }
        if !self.quick_reply_hours.is_finite() || !self.max_time_gap_hours.is_finite() {
            return Err(CoreError::Config(format!(
                "time gap thresholds must be finite (got quick_reply_hours={}, max_time_gap_hours={})",
                self.quick_reply_hours, self.max_time_gap_hours
            )));
        }
        if self.quick_reply_hours < 0.0 || self.quick_reply_hours >= self.max_time_gap_hours {
            return Err(CoreError::Config(format!(
                "quick_reply_hours ({}) must be non-negative and below max_time_gap_hours ({})",
                self.quick_reply_hours, self.max_time_gap_hours
            )));
        }
        Ok(())
    }
}

impl Default for ContextEngineConfig {
    fn default() -> Self {
        Self {
            entity_weight: default_entity_weight(),
            semantic_weight: default_semantic_weight(),
            thread_weight: default_thread_weight(),
            max_candidates: default_max_candidates(),
            timeout_seconds: default_timeout_seconds(),
            per_query_limit: default_per_query_limit(),
            max_workers: default_max_workers(),
        }
    }
}

impl ContextEngineConfig {
    /// Validate the strategy weights into a weight set.
    pub fn to_weight_set(&self) -> Result<WeightSet<Strategy>> {
        WeightSet::new([
            (Strategy::Entity, self.entity_weight),
            (Strategy::Semantic, self.semantic_weight),
            (Strategy::Thread, self.thread_weight),
        ])
    }

    /// Check limits. Weights are checked by `to_weight_set`.
    pub fn validate_limits(&self) -> Result<()> {
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(CoreError::Config(format!(
                "timeout_seconds must be positive (got {})",
                self.timeout_seconds
            )));
        }
        if self.max_workers == 0 {
            return Err(CoreError::Config("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_passes: default_max_passes(),
        }
    }
}

impl SubstrateConfig {
    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SubstrateConfig = toml::from_str(content)
            .map_err(|e| CoreError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| CoreError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<()> {
        self.continuity.weights.to_weight_set()?;
        self.continuity.validate_thresholds()?;
        self.context.to_weight_set()?;
        self.context.validate_limits()?;

        if !(0.0..=1.0).contains(&self.reasoning.confidence_threshold) {
            return Err(CoreError::ConfidenceOutOfRange(
                self.reasoning.confidence_threshold,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SubstrateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.context.max_candidates, 200);
        assert_eq!(config.continuity.continuity_threshold, 0.6);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = SubstrateConfig::from_toml_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.reasoning.max_passes, 3);
        assert_eq!(config.context.timeout_seconds, 10.0);
    }

    #[test]
    fn test_partial_sections() {
        let config = SubstrateConfig::from_toml_str(
            r#"
[context]
timeout_seconds = 2.5

[reasoning]
max_passes = 5
"#,
        )
        .unwrap();

        assert_eq!(config.context.timeout_seconds, 2.5);
        assert_eq!(config.context.entity_weight, 0.4);
        assert_eq!(config.reasoning.max_passes, 5);
    }

    #[test]
    fn test_rejects_bad_context_weights() {
        let err = SubstrateConfig::from_toml_str(
            r#"
[context]
entity_weight = 0.5
semantic_weight = 0.5
thread_weight = 0.5
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must sum to 1.0"));
    }

    #[test]
    fn test_rejects_inverted_time_thresholds() {
        let err = SubstrateConfig::from_toml_str(
            r#"
[continuity]
quick_reply_hours = 30.0
max_time_gap_hours = 24.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_rejects_non_finite_time_thresholds() {
        let err = SubstrateConfig::from_toml_str("[continuity]\nquick_reply_hours = nan\n")
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));

        let err = SubstrateConfig::from_toml_str("[continuity]\nmax_time_gap_hours = inf\n")
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_partial_continuity_weights() {
        let config = SubstrateConfig::from_toml_str(
            r#"
[continuity.weights]
time_proximity = 0.35
participant_overlap = 0.20
"#,
        )
        .unwrap();

        let weights = &config.continuity.weights;
        assert_eq!(weights.time_proximity, 0.35);
        assert_eq!(weights.participant_overlap, 0.20);
        assert_eq!(weights.topic_similarity, 0.25);
        assert_eq!(weights.entity_overlap, 0.20);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = SubstrateConfig::default();
        config.log_level = "debug".into();
        config.context.max_candidates = 50;

        let toml_string = config.to_toml_string().unwrap();
        let parsed = SubstrateConfig::from_toml_str(&toml_string).unwrap();

        assert_eq!(parsed.log_level, "debug");
        assert_eq!(parsed.context.max_candidates, 50);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"warn\"").unwrap();

        let config = SubstrateConfig::load(file.path()).unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_missing_file() {
        let err = SubstrateConfig::load(Path::new("/nonexistent/substrate.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
