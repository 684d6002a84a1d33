//! Knowledge Base - the external document store the context engine queries.
//!
//! The engine only depends on the `KnowledgeBase` trait:
//! - **Entity search**: documents associated with an entity, as (document, raw score)
//! - **Similarity search**: documents similar to free text, as (document, raw score)
//! - **Thread metadata**: the thread a document belongs to
//!
//! Raw scores are interpreted according to the store's `DistanceMetric`.
//! Calls are blocking; the engine runs them off the caller's task.

mod document;
mod memory;

pub use document::*;
pub use memory::*;

use serde::{Deserialize, Serialize};

use crate::error::KnowledgeBaseError;
use event_model::Entity;

/// How a store's raw scores should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Raw score is a cosine similarity (higher is closer).
    Cosine,
    /// Raw score is a normalized inner product (higher is closer).
    InnerProduct,
    /// Raw score is a Euclidean distance (lower is closer).
    Euclidean,
}

/// A scored hit returned by a knowledge-base query.
pub type ScoredDocument = (Document, f32);

/// Collaborator contract for knowledge-base access.
pub trait KnowledgeBase: Send + Sync {
    /// Metric the raw scores of this store are expressed in.
    fn metric(&self) -> DistanceMetric;

    /// Documents associated with `entity`, best first, at most `limit`.
    fn search_by_entity(
        &self,
        entity: &Entity,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, KnowledgeBaseError>;

    /// Documents similar to `query`, best first, at most `limit`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>, KnowledgeBaseError>;

    /// Thread the document belongs to, read from its own metadata.
    fn thread_id_of<'a>(&self, document: &'a Document) -> Option<&'a str> {
        document.thread_id()
    }
}
