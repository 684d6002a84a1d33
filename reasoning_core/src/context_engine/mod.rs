//! Context Engine - retrieves knowledge-base context for an event.
//!
//! Retrieval runs up to three independent strategies:
//! 1. **Entity**: documents associated with each extracted entity
//! 2. **Semantic**: documents similar to the event's title and content
//! 3. **Thread**: documents belonging to the event's own thread
//!
//! Strategies are blocking knowledge-base calls. They run on the blocking pool,
//! at most `max_workers` at a time, under one overall deadline. Knowledge-base
//! failures are logged and count as "no items from this strategy"; hitting the
//! deadline yields an empty result flagged as timed out. Retrieval never
//! returns an error to the caller.

mod item;
mod ranking;

pub use item::*;
pub use ranking::*;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use event_model::PerceivedEvent;

use crate::config::ContextEngineConfig;
use crate::error::{CoreError, KnowledgeBaseError, Result};
use crate::knowledge_base::KnowledgeBase;
use crate::weights::WeightSet;
use crate::working_memory::WorkingMemory;

/// Relevance given to documents found in the event's own thread.
pub const THREAD_MEMBERSHIP_RELEVANCE: f32 = 0.9;

/// Retrieval strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Entity,
    Semantic,
    Thread,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Entity => "entity",
            Strategy::Semantic => "semantic",
            Strategy::Thread => "thread",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a retrieval ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalStatus {
    Complete,
    /// The deadline expired; no items were returned.
    TimedOut,
}

/// Outcome of one retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    /// Ranked, deduplicated items, best first.
    pub items: Vec<ContextItem>,

    /// Strategies that ran and completed, in priority order.
    pub sources_used: Vec<String>,

    pub status: RetrievalStatus,

    /// Raw items considered before ranking (bounded by `max_candidates`).
    pub candidates_considered: usize,

    pub elapsed_ms: u64,
}

impl ContextResult {
    fn timed_out(elapsed: Duration) -> Self {
        Self {
            items: Vec::new(),
            sources_used: Vec::new(),
            status: RetrievalStatus::TimedOut,
            candidates_considered: 0,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.status == RetrievalStatus::TimedOut
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Retrieves and ranks supporting context from a knowledge base.
pub struct ContextEngine {
    knowledge_base: Arc<dyn KnowledgeBase>,
    weights: WeightSet<Strategy>,
    max_candidates: usize,
    timeout: Duration,
    per_query_limit: usize,
    workers: Arc<Semaphore>,
}

impl ContextEngine {
    /// Create an engine, validating strategy weights and limits.
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>, config: ContextEngineConfig) -> Result<Self> {
        let weights = config.to_weight_set()?;
        config.validate_limits()?;

        let timeout = Duration::try_from_secs_f64(config.timeout_seconds)
            .map_err(|e| CoreError::Config(format!("Invalid timeout_seconds: {}", e)))?;

        Ok(Self {
            knowledge_base,
            weights,
            max_candidates: config.max_candidates,
            timeout,
            per_query_limit: config.per_query_limit,
            workers: Arc::new(Semaphore::new(config.max_workers)),
        })
    }

    pub fn weights(&self) -> &WeightSet<Strategy> {
        &self.weights
    }

    /// Strategies that apply to `event`, in priority order.
    pub fn active_strategies(&self, event: &PerceivedEvent) -> Vec<Strategy> {
        let mut plan = Vec::new();

        if self.weights.get(&Strategy::Entity) > 0.0 && !event.entities.is_empty() {
            plan.push(Strategy::Entity);
        }
        if self.weights.get(&Strategy::Semantic) > 0.0 {
            plan.push(Strategy::Semantic);
        }
        if self.weights.get(&Strategy::Thread) > 0.0 && event.thread_id().is_some() {
            plan.push(Strategy::Thread);
        }

        plan
    }

    /// Retrieve the `top_k` most relevant items for `event` scoring at least
    /// `min_relevance` after strategy weighting.
    pub async fn retrieve_context(
        &self,
        event: &PerceivedEvent,
        top_k: usize,
        min_relevance: f32,
    ) -> ContextResult {
        let started = Instant::now();
        let plan = self.active_strategies(event);

        let outcomes = match tokio::time::timeout(self.timeout, self.run_strategies(event, &plan)).await
        {
            Ok(outcomes) => outcomes,
            Err(_) => {
                warn!(
                    event = %event.source_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Context retrieval timed out; returning empty result"
                );
                return ContextResult::timed_out(started.elapsed());
            }
        };

        let mut sources_used = Vec::new();
        let mut candidates: Vec<(Strategy, ContextItem)> = Vec::new();

        // Cap is consumed in priority order; later strategies may get nothing
        for (strategy, outcome) in outcomes {
            let items = match outcome {
                Ok(items) => items,
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, "Retrieval strategy failed; skipping");
                    continue;
                }
            };
            sources_used.push(strategy.to_string());

            let room = self.max_candidates.saturating_sub(candidates.len());
            candidates.extend(items.into_iter().take(room).map(|item| (strategy, item)));
        }

        let candidates_considered = candidates.len();
        let items = rank_candidates(candidates, &self.weights, top_k, min_relevance);

        info!(
            event = %event.source_id,
            sources = ?sources_used,
            candidates = candidates_considered,
            returned = items.len(),
            "Context retrieved"
        );

        ContextResult {
            items,
            sources_used,
            status: RetrievalStatus::Complete,
            candidates_considered,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Retrieve context and attach the ranked items to `memory`.
    pub async fn retrieve_into(
        &self,
        memory: &mut WorkingMemory,
        top_k: usize,
        min_relevance: f32,
    ) -> ContextResult {
        let event = memory.event().clone();
        let result = self.retrieve_context(&event, top_k, min_relevance).await;
        for item in &result.items {
            memory.add_context(item.clone());
        }
        result
    }

    /// Run the planned strategies on the blocking pool, bounded by the worker
    /// semaphore. A permit is held until its knowledge-base call returns, even
    /// if the caller stopped waiting. Outcomes come back in plan order.
    async fn run_strategies(
        &self,
        event: &PerceivedEvent,
        plan: &[Strategy],
    ) -> Vec<(Strategy, std::result::Result<Vec<ContextItem>, KnowledgeBaseError>)> {
        let runs = plan.iter().map(|&strategy| {
            let knowledge_base = Arc::clone(&self.knowledge_base);
            let workers = Arc::clone(&self.workers);
            let event = event.clone();
            let limit = self.per_query_limit;

            async move {
                let permit = match workers.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return (strategy, Err(KnowledgeBaseError::Unavailable(e.to_string())));
                    }
                };

                // The permit travels with the blocking call so a timed-out
                // retrieval keeps its slot until the knowledge base returns.
                let joined = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    run_strategy(knowledge_base.as_ref(), &event, strategy, limit)
                })
                .await;

                let outcome = joined.unwrap_or_else(|e| {
                    Err(KnowledgeBaseError::Query(format!(
                        "{} strategy aborted: {}",
                        strategy, e
                    )))
                });
                (strategy, outcome)
            }
        });

        join_all(runs).await
    }
}

/// Execute one strategy against the knowledge base. Runs on a blocking thread.
fn run_strategy(
    knowledge_base: &dyn KnowledgeBase,
    event: &PerceivedEvent,
    strategy: Strategy,
    limit: usize,
) -> std::result::Result<Vec<ContextItem>, KnowledgeBaseError> {
    match strategy {
        Strategy::Entity => Ok(entity_strategy(knowledge_base, event, limit)),
        Strategy::Semantic => semantic_strategy(knowledge_base, event, limit),
        Strategy::Thread => thread_strategy(knowledge_base, event, limit),
    }
}

/// One query per entity; relevance is entity confidence times converted score.
/// A failing entity is skipped without affecting the others.
fn entity_strategy(
    knowledge_base: &dyn KnowledgeBase,
    event: &PerceivedEvent,
    limit: usize,
) -> Vec<ContextItem> {
    let metric = knowledge_base.metric();
    let mut items = Vec::new();

    for entity in &event.entities {
        match knowledge_base.search_by_entity(entity, limit) {
            Ok(hits) => {
                for (document, raw) in hits {
                    let relevance = entity.confidence * distance_to_relevance(raw, metric);
                    items.push(ContextItem::from_document(document, Strategy::Entity, relevance));
                }
            }
            Err(e) => {
                warn!(
                    entity_type = %entity.entity_type,
                    entity = %entity.value,
                    error = %e,
                    "Entity lookup failed; skipping entity"
                );
            }
        }
    }

    debug!(count = items.len(), "Entity strategy finished");
    items
}

fn semantic_strategy(
    knowledge_base: &dyn KnowledgeBase,
    event: &PerceivedEvent,
    limit: usize,
) -> std::result::Result<Vec<ContextItem>, KnowledgeBaseError> {
    let metric = knowledge_base.metric();
    let hits = knowledge_base.search(&event.query_text(), limit)?;

    let items: Vec<ContextItem> = hits
        .into_iter()
        .map(|(document, raw)| {
            ContextItem::from_document(document, Strategy::Semantic, distance_to_relevance(raw, metric))
        })
        .collect();

    debug!(count = items.len(), "Semantic strategy finished");
    Ok(items)
}

/// Keeps only documents whose own thread id equals the event's.
fn thread_strategy(
    knowledge_base: &dyn KnowledgeBase,
    event: &PerceivedEvent,
    limit: usize,
) -> std::result::Result<Vec<ContextItem>, KnowledgeBaseError> {
    let Some(thread_id) = event.thread_id() else {
        return Ok(Vec::new());
    };

    let hits = knowledge_base.search(&event.query_text(), limit)?;
    let items: Vec<ContextItem> = hits
        .into_iter()
        .filter(|(document, _)| knowledge_base.thread_id_of(document) == Some(thread_id))
        .map(|(document, _)| {
            ContextItem::from_document(document, Strategy::Thread, THREAD_MEMBERSHIP_RELEVANCE)
        })
        .collect();

    debug!(thread = thread_id, count = items.len(), "Thread strategy finished");
    Ok(items)
}
