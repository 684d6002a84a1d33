//! Documents - entries stored in a knowledge base.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use event_model::{DocumentId, Entity, EntityType};

/// Types of documents in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Note,
    Email,
    Meeting,
    File,
    Chat,
    Generic,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Note => "note",
            DocumentType::Email => "email",
            DocumentType::Meeting => "meeting",
            DocumentType::File => "file",
            DocumentType::Chat => "chat",
            DocumentType::Generic => "generic",
        }
    }
}

/// Structured document metadata. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Where the document came from (mailbox, vault path, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// A piece of knowledge stored in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,

    /// Human-readable content of the document.
    pub content: String,

    pub doc_type: DocumentType,

    pub metadata: DocumentMetadata,

    /// Entities this document is about, keyed by (type, lower-cased value).
    pub entities: HashSet<(EntityType, String)>,

    /// Salience score (0.0 - 1.0) reported for entity associations.
    pub salience: f32,

    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document with the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            content: content.into(),
            doc_type: DocumentType::Generic,
            metadata: DocumentMetadata::default(),
            entities: HashSet::new(),
            salience: 1.0,
            created_at: Utc::now(),
        }
    }

    pub fn with_type(mut self, doc_type: DocumentType) -> Self {
        self.doc_type = doc_type;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.metadata.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.metadata.origin = Some(origin.into());
        self
    }

    /// Associate an entity with this document.
    pub fn with_entity(mut self, entity: &Entity) -> Self {
        self.entities.insert(entity.key());
        self
    }

    /// Set the salience score.
    pub fn with_salience(mut self, salience: f32) -> Self {
        self.salience = salience.clamp(0.0, 1.0);
        self
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.metadata.thread_id.as_deref().filter(|t| !t.is_empty())
    }

    /// Check if this document is about a specific entity.
    pub fn mentions(&self, entity: &Entity) -> bool {
        self.entities.contains(&entity.key())
    }

    /// Title followed by content, as indexed for similarity search.
    pub fn searchable_text(&self) -> String {
        match &self.metadata.title {
            Some(title) => format!("{} {}", title, self.content),
            None => self.content.clone(),
        }
    }
}
