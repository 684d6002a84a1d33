//! Context items - supporting material attached to a working memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Strategy;
use crate::knowledge_base::Document;
use event_model::DocumentId;

/// Provenance of a context item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    /// Knowledge-base document this item was built from. Used for deduplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,

    /// Retrieval strategy that produced the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A piece of supporting context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub source: String,
    pub item_type: String,
    pub content: String,

    /// Relevance (0.0 - 1.0). Ranking overwrites it with the weighted score.
    pub relevance_score: f32,

    pub metadata: ContextMetadata,
    pub retrieved_at: DateTime<Utc>,
}

impl ContextItem {
    /// Create a context item with a clamped relevance.
    pub fn new(
        source: impl Into<String>,
        item_type: impl Into<String>,
        content: impl Into<String>,
        relevance_score: f32,
    ) -> Self {
        Self {
            source: source.into(),
            item_type: item_type.into(),
            content: content.into(),
            relevance_score: clamp_relevance(relevance_score),
            metadata: ContextMetadata::default(),
            retrieved_at: Utc::now(),
        }
    }

    /// Build an item from a knowledge-base hit.
    pub fn from_document(document: Document, strategy: Strategy, relevance_score: f32) -> Self {
        let metadata = ContextMetadata {
            document_id: Some(document.id),
            strategy: Some(strategy),
            thread_id: document.metadata.thread_id.clone(),
            title: document.metadata.title.clone(),
        };

        Self {
            source: format!("knowledge_base:{}", strategy),
            item_type: document.doc_type.as_str().to_string(),
            content: document.content,
            relevance_score: clamp_relevance(relevance_score),
            metadata,
            retrieved_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: ContextMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.metadata.document_id
    }
}

/// Clamp into [0, 1]; NaN becomes 0.0.
fn clamp_relevance(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
