//! In-memory knowledge base - a reference store for embedding the engine
//! without external storage.
//!
//! Similarity is lexical (token Jaccard) and reported as a cosine-style
//! similarity. This is not a vector index.

use std::collections::{HashMap, HashSet};

use super::{DistanceMetric, Document, KnowledgeBase, ScoredDocument};
use crate::continuity::similarity::jaccard;
use crate::error::KnowledgeBaseError;
use event_model::{DocumentId, Entity, EntityType};

/// Documents indexed by entity and thread.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    /// All documents stored by ID.
    documents: HashMap<DocumentId, Document>,

    /// Index: entity key -> documents about this entity.
    entity_index: HashMap<(EntityType, String), HashSet<DocumentId>>,

    /// Index: thread id -> documents in this thread.
    thread_index: HashMap<String, HashSet<DocumentId>>,
}

impl InMemoryKnowledgeBase {
    /// Create a new empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. Returns its ID for reference.
    pub fn add_document(&mut self, document: Document) -> DocumentId {
        let id = document.id;

        for key in &document.entities {
            self.entity_index.entry(key.clone()).or_default().insert(id);
        }

        if let Some(thread_id) = document.thread_id() {
            self.thread_index
                .entry(thread_id.to_string())
                .or_default()
                .insert(id);
        }

        self.documents.insert(id, document);
        id
    }

    /// Remove a document from the knowledge base.
    pub fn remove_document(&mut self, id: DocumentId) -> Option<Document> {
        let document = self.documents.remove(&id)?;

        for key in &document.entities {
            if let Some(ids) = self.entity_index.get_mut(key) {
                ids.remove(&id);
            }
        }
        if let Some(thread_id) = document.thread_id() {
            if let Some(ids) = self.thread_index.get_mut(thread_id) {
                ids.remove(&id);
            }
        }

        Some(document)
    }

    pub fn get_document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Get all documents associated with an entity.
    pub fn documents_by_entity(&self, entity: &Entity) -> Vec<&Document> {
        self.entity_index
            .get(&entity.key())
            .map(|ids| ids.iter().filter_map(|id| self.documents.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all documents in a thread.
    pub fn documents_in_thread(&self, thread_id: &str) -> Vec<&Document> {
        self.thread_index
            .get(thread_id)
            .map(|ids| ids.iter().filter_map(|id| self.documents.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl KnowledgeBase for InMemoryKnowledgeBase {
    fn metric(&self) -> DistanceMetric {
        DistanceMetric::Cosine
    }

    fn search_by_entity(
        &self,
        entity: &Entity,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, KnowledgeBaseError> {
        let hits = self
            .documents_by_entity(entity)
            .into_iter()
            .map(|doc| (doc.clone(), doc.salience))
            .collect();
        Ok(best_first(hits, limit))
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>, KnowledgeBaseError> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self
            .documents
            .values()
            .filter_map(|doc| {
                let score = jaccard(&query_tokens, &tokenize(&doc.searchable_text()));
                (score > 0.0).then(|| (doc.clone(), score))
            })
            .collect();
        Ok(best_first(hits, limit))
    }
}

/// Sort hits by score (descending, ties by id for determinism) and truncate.
fn best_first(mut hits: Vec<ScoredDocument>, limit: usize) -> Vec<ScoredDocument> {
    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.0.cmp(&b.0.id.0))
    });
    hits.truncate(limit);
    hits
}

/// Lower-cased alphanumeric tokens.
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get_document() {
        let mut kb = InMemoryKnowledgeBase::new();

        let id = kb.add_document(Document::new("The office moves in May"));

        let retrieved = kb.get_document(id);
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().content, "The office moves in May");
        assert_eq!(kb.document_count(), 1);
    }

    #[test]
    fn test_documents_by_entity() {
        let mut kb = InMemoryKnowledgeBase::new();
        let dana = Entity::person("Dana");

        kb.add_document(Document::new("Dana leads hiring").with_entity(&dana));
        kb.add_document(Document::new("Dana is on leave in July").with_entity(&dana));
        kb.add_document(Document::new("Lunch menu"));

        assert_eq!(kb.documents_by_entity(&Entity::person("dana")).len(), 2);
        assert!(kb.documents_by_entity(&Entity::person("Eli")).is_empty());
    }

    #[test]
    fn test_remove_document() {
        let mut kb = InMemoryKnowledgeBase::new();
        let dana = Entity::person("Dana");

        let id = kb.add_document(
            Document::new("Removable")
                .with_entity(&dana)
                .with_thread_id("T1"),
        );
        assert_eq!(kb.documents_in_thread("T1").len(), 1);

        let removed = kb.remove_document(id);
        assert!(removed.is_some());
        assert!(kb.get_document(id).is_none());
        assert!(kb.documents_by_entity(&dana).is_empty());
        assert!(kb.documents_in_thread("T1").is_empty());
    }

    #[test]
    fn test_entity_search_uses_salience() {
        let mut kb = InMemoryKnowledgeBase::new();
        let acme = Entity::organization("Acme");

        kb.add_document(Document::new("Acme invoice").with_entity(&acme).with_salience(0.3));
        kb.add_document(Document::new("Acme contract").with_entity(&acme).with_salience(0.9));

        let hits = kb.search_by_entity(&acme, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.content, "Acme contract");
        assert!((hits[0].1 - 0.9).abs() < 0.001);

        let capped = kb.search_by_entity(&acme, 1).unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_lexical_search() {
        let mut kb = InMemoryKnowledgeBase::new();

        kb.add_document(Document::new("Quarterly budget review notes"));
        kb.add_document(Document::new("Budget"));
        kb.add_document(Document::new("Team offsite photos"));

        let hits = kb.search("budget review", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].1 >= hits[1].1);
        assert!(hits.iter().all(|(doc, _)| doc.content.contains("udget")));

        assert!(kb.search("   ", 10).unwrap().is_empty());
        assert_eq!(kb.metric(), DistanceMetric::Cosine);
    }

    #[test]
    fn test_thread_id_from_metadata() {
        let kb = InMemoryKnowledgeBase::new();
        let doc = Document::new("x").with_thread_id("T5");
        assert_eq!(kb.thread_id_of(&doc), Some("T5"));
    }
}
