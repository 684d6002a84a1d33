//! Entity mentions extracted from events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kinds of entities the perception layer extracts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Date,
    Topic,
    Url,
    /// Custom entity kind for extension.
    Other(String),
}

impl EntityType {
    /// Get the category name of this entity type.
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Person => "person",
            EntityType::Organization => "organization",
            EntityType::Location => "location",
            EntityType::Date => "date",
            EntityType::Topic => "topic",
            EntityType::Url => "url",
            EntityType::Other(kind) => kind.as_str(),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, confidence-scored mention extracted from an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: EntityType,
    pub value: String,

    /// Extraction confidence (0.0 - 1.0).
    pub confidence: f32,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Entity {
    /// Create a new entity with full confidence.
    pub fn new(entity_type: EntityType, value: impl Into<String>) -> Self {
        Self {
            entity_type,
            value: value.into(),
            confidence: 1.0,
            metadata: HashMap::new(),
        }
    }

    pub fn person(value: impl Into<String>) -> Self {
        Self::new(EntityType::Person, value)
    }

    pub fn organization(value: impl Into<String>) -> Self {
        Self::new(EntityType::Organization, value)
    }

    pub fn topic(value: impl Into<String>) -> Self {
        Self::new(EntityType::Topic, value)
    }

    /// Set the confidence, clamped into [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Identity used when comparing entities across events: type plus
    /// lower-cased value.
    pub fn key(&self) -> (EntityType, String) {
        (self.entity_type.clone(), self.value.trim().to_lowercase())
    }
}
