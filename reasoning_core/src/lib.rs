//! # Reasoning Core
//!
//! The substrate an event-driven assistant reasons on. For every perceived
//! event the orchestrator:
//!
//! 1. asks the [`ContinuityDetector`] whether the event continues an earlier
//!    conversation,
//! 2. creates a [`WorkingMemory`] to hold hypotheses, context and questions
//!    across several reasoning passes,
//! 3. pulls background knowledge through the [`ContextEngine`], which runs
//!    entity, semantic and thread retrieval against a [`KnowledgeBase`]
//!    concurrently and ranks the results.
//!
//! The loop itself, the reasoning model and persistence live outside this
//! crate. Event types come from `event_model`.
//!
//! ## Modules
//!
//! - **continuity**: weighted multi-signal conversation continuity scoring
//! - **working_memory**: per-event scratchpad with pass bookkeeping
//! - **context_engine**: multi-strategy retrieval with timeout and ranking
//! - **knowledge_base**: the retrieval collaborator trait plus an in-memory store
//! - **config** / **telemetry**: TOML configuration and `tracing` setup

pub mod config;
pub mod context_engine;
pub mod continuity;
pub mod error;
pub mod knowledge_base;
pub mod telemetry;
pub mod weights;
pub mod working_memory;

pub use config::*;
pub use context_engine::*;
pub use continuity::*;
pub use error::*;
pub use knowledge_base::*;
pub use weights::*;
pub use working_memory::*;
