//! Perceived events.

mod metadata;

pub use metadata::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Entity, EventError, EventId, EventTime};

/// Channel an event arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Email,
    Calendar,
    Chat,
    File,
    Question,
    Other,
}

/// Normalized representation of one inbound item.
///
/// Events are immutable once produced; the builder methods consume `self`
/// and are meant for the perception layer and for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceivedEvent {
    pub event_id: EventId,

    /// Identifier assigned by the originating system (e.g. a Message-ID).
    pub source_id: String,

    pub kind: EventKind,

    pub occurred_at: EventTime,
    pub received_at: EventTime,

    pub title: String,
    pub content: String,

    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,

    #[serde(default)]
    pub thread_id: Option<String>,

    /// `source_id` of the event this one replies to.
    #[serde(default)]
    pub in_reply_to: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default)]
    pub metadata: EventMetadata,

    /// Perception confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl PerceivedEvent {
    /// Create a new event. `received_at` defaults to `occurred_at`.
    pub fn new(source_id: impl Into<String>, kind: EventKind, occurred_at: EventTime) -> Self {
        Self {
            event_id: EventId::new(),
            source_id: source_id.into(),
            kind,
            occurred_at,
            received_at: occurred_at,
            title: String::new(),
            content: String::new(),
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            thread_id: None,
            in_reply_to: None,
            topics: Vec::new(),
            keywords: Vec::new(),
            entities: Vec::new(),
            metadata: EventMetadata::default(),
            confidence: 1.0,
        }
    }

    /// Decode an event from JSON, rejecting confidences outside [0, 1].
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let event: PerceivedEvent = serde_json::from_str(json)?;
        event.validate()?;
        Ok(event)
    }

    /// Check every confidence field.
    pub fn validate(&self) -> Result<(), EventError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EventError::InvalidConfidence {
                field: "event".to_string(),
                value: self.confidence,
            });
        }
        for entity in &self.entities {
            if !(0.0..=1.0).contains(&entity.confidence) {
                return Err(EventError::InvalidConfidence {
                    field: format!("entity '{}'", entity.value),
                    value: entity.confidence,
                });
            }
        }
        Ok(())
    }

    pub fn with_received_at(mut self, received_at: EventTime) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_to(mut self, to: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.to.extend(to.into_iter().map(Into::into));
        self
    }

    pub fn with_cc(mut self, cc: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cc.extend(cc.into_iter().map(Into::into));
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn in_reply_to(mut self, source_id: impl Into<String>) -> Self {
        self.in_reply_to = Some(source_id.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the perception confidence, clamped into [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Lower-cased union of from, to and cc addresses.
    pub fn participants(&self) -> HashSet<String> {
        self.from
            .iter()
            .chain(self.to.iter())
            .chain(self.cc.iter())
            .map(|addr| addr.trim().to_lowercase())
            .filter(|addr| !addr.is_empty())
            .collect()
    }

    /// Thread identifier, falling back to the metadata field. Empty strings
    /// count as absent.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.metadata.thread_id.as_deref().filter(|t| !t.is_empty()))
    }

    /// Title and content joined as one free-text query.
    pub fn query_text(&self) -> String {
        match (self.title.trim(), self.content.trim()) {
            ("", content) => content.to_string(),
            (title, "") => title.to_string(),
            (title, content) => format!("{}\n{}", title, content),
        }
    }
}
