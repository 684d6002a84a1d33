//! Working Memory - the per-event scratchpad of the reasoning loop.
//!
//! One working memory is created for each event and owned by the single loop
//! processing it. It holds competing hypotheses, attached context, open
//! questions and the history of completed reasoning passes. The orchestrator
//! polls `needs_more_reasoning` to decide whether to run another pass.
//!
//! At most one pass is open at a time. Failed operations leave the memory
//! unchanged.

mod hypothesis;
mod pass;

pub use hypothesis::*;
pub use pass::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use event_model::PerceivedEvent;

use crate::config::ReasoningConfig;
use crate::context_engine::ContextItem;
use crate::error::{CoreError, Result};
use hypothesis::{check_confidence, push_unique};

/// Lifecycle of a working memory.
///
/// `Initialized` moves to `Reasoning` when the first pass starts. The terminal
/// states are only entered through `WorkingMemory::conclude`, based on exit
/// conditions the orchestrator evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryState {
    Initialized,
    Reasoning,
    Converged,
    Exhausted,
    NeedsClarification,
}

impl MemoryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MemoryState::Converged | MemoryState::Exhausted | MemoryState::NeedsClarification
        )
    }
}

/// Per-event reasoning scratchpad.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingMemory {
    event: PerceivedEvent,
    state: MemoryState,
    overall_confidence: f32,

    /// Hypotheses keyed by id.
    hypotheses: BTreeMap<String, Hypothesis>,

    context: Vec<ContextItem>,
    questions: Vec<String>,
    uncertainties: Vec<String>,

    /// Completed passes in completion order.
    reasoning_passes: Vec<ReasoningPass>,
    active_pass: Option<ActivePass>,

    is_continuous: bool,
    conversation_id: Option<String>,
    previous_events: Vec<PerceivedEvent>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Read-only summary of a working memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningSummary {
    pub event_source_id: String,
    pub state: MemoryState,
    pub overall_confidence: f32,
    pub passes_completed: usize,
    pub pass_active: bool,
    pub best_hypothesis: Option<Hypothesis>,
    pub hypothesis_count: usize,
    pub context_count: usize,
    pub open_questions: Vec<String>,
    pub uncertainties: Vec<String>,
    pub is_continuous: bool,
    pub conversation_id: Option<String>,
    pub confidence_trajectory: Vec<f32>,
    pub total_reasoning_ms: i64,
}

impl WorkingMemory {
    /// Create an empty working memory for `event`.
    pub fn new(event: PerceivedEvent) -> Self {
        let now = Utc::now();
        Self {
            event,
            state: MemoryState::Initialized,
            overall_confidence: 0.0,
            hypotheses: BTreeMap::new(),
            context: Vec::new(),
            questions: Vec::new(),
            uncertainties: Vec::new(),
            reasoning_passes: Vec::new(),
            active_pass: None,
            is_continuous: false,
            conversation_id: None,
            previous_events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn event(&self) -> &PerceivedEvent {
        &self.event
    }

    pub fn state(&self) -> MemoryState {
        self.state
    }

    pub fn overall_confidence(&self) -> f32 {
        self.overall_confidence
    }

    pub fn reasoning_passes(&self) -> &[ReasoningPass] {
        &self.reasoning_passes
    }

    pub fn active_pass(&self) -> Option<&ActivePass> {
        self.active_pass.as_ref()
    }

    pub fn context(&self) -> &[ContextItem] {
        &self.context
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn uncertainties(&self) -> &[String] {
        &self.uncertainties
    }

    pub fn is_continuous(&self) -> bool {
        self.is_continuous
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn previous_events(&self) -> &[PerceivedEvent] {
        &self.previous_events
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ── Reasoning passes ────────────────────────────────────────────────

    /// Open a pass, snapshotting current confidence and hypothesis count.
    ///
    /// Fails if a pass is already open, if `pass_number` does not increase on
    /// the last completed pass, or if the memory has been concluded.
    pub fn start_reasoning_pass(&mut self, pass_number: u32, pass_type: PassType) -> Result<()> {
        if let Some(active) = &self.active_pass {
            return Err(CoreError::PassAlreadyActive(active.pass_number));
        }
        if self.state.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "cannot start pass {} after concluding as {:?}",
                pass_number, self.state
            )));
        }
        if let Some(last) = self.reasoning_passes.last() {
            if pass_number <= last.pass_number {
                return Err(CoreError::InvalidState(format!(
                    "pass number {} does not follow completed pass {}",
                    pass_number, last.pass_number
                )));
            }
        }

        self.active_pass = Some(ActivePass::open(
            pass_number,
            pass_type,
            self.overall_confidence,
            self.hypotheses.len(),
        ));
        self.state = MemoryState::Reasoning;
        self.touch();

        debug!(
            event = %self.event.source_id,
            pass = pass_number,
            pass_type = ?pass_type,
            "Reasoning pass started"
        );
        Ok(())
    }

    /// Close the open pass and append it to the history.
    pub fn complete_reasoning_pass(&mut self) -> Result<&ReasoningPass> {
        let active = self.active_pass.take().ok_or(CoreError::NoActivePass)?;
        let pass = active.close(self.overall_confidence, self.hypotheses.len());

        info!(
            event = %self.event.source_id,
            pass = pass.pass_number,
            confidence = pass.output_confidence,
            delta = pass.confidence_delta(),
            duration_ms = pass.duration_ms(),
            "Reasoning pass completed"
        );

        self.reasoning_passes.push(pass);
        self.touch();
        Ok(&self.reasoning_passes[self.reasoning_passes.len() - 1])
    }

    /// Record an insight on the open pass.
    pub fn record_insight(&mut self, insight: impl Into<String>) -> Result<()> {
        let active = self.active_pass.as_mut().ok_or(CoreError::NoActivePass)?;
        push_unique(&mut active.insights, insight.into());
        self.touch();
        Ok(())
    }

    // ── Hypotheses & confidence ─────────────────────────────────────────

    /// Insert or replace a hypothesis by id.
    pub fn add_hypothesis(&mut self, hypothesis: Hypothesis) {
        self.hypotheses.insert(hypothesis.id.clone(), hypothesis);
        self.touch();
    }

    pub fn get_hypothesis(&self, id: &str) -> Option<&Hypothesis> {
        self.hypotheses.get(id)
    }

    /// Update one hypothesis' confidence.
    pub fn update_hypothesis_confidence(&mut self, id: &str, confidence: f32) -> Result<()> {
        check_confidence(confidence)?;
        let hypothesis = self
            .hypotheses
            .get_mut(id)
            .ok_or_else(|| CoreError::InvalidState(format!("unknown hypothesis '{}'", id)))?;
        hypothesis.set_confidence(confidence)?;
        self.touch();
        Ok(())
    }

    pub fn hypothesis_count(&self) -> usize {
        self.hypotheses.len()
    }

    /// Highest-confidence hypothesis, computed on every call.
    pub fn current_best_hypothesis(&self) -> Option<&Hypothesis> {
        self.hypotheses.values().max_by(|a, b| {
            a.confidence()
                .partial_cmp(&b.confidence())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Up to `n` hypotheses, highest confidence first.
    pub fn get_top_hypotheses(&self, n: usize) -> Vec<&Hypothesis> {
        let mut ranked: Vec<&Hypothesis> = self.hypotheses.values().collect();
        ranked.sort_by(|a, b| {
            b.confidence()
                .partial_cmp(&a.confidence())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }

    /// Set overall confidence. Fails if outside [0, 1].
    pub fn update_confidence(&mut self, confidence: f32) -> Result<()> {
        check_confidence(confidence)?;
        self.overall_confidence = confidence;
        self.touch();
        Ok(())
    }

    pub fn is_confident(&self, threshold: f32) -> bool {
        self.overall_confidence >= threshold
    }

    /// Loop-continuation predicate: not yet confident and passes remain.
    pub fn needs_more_reasoning(&self, threshold: f32, max_passes: usize) -> bool {
        !self.is_confident(threshold) && self.reasoning_passes.len() < max_passes
    }

    pub fn needs_more_reasoning_with(&self, config: &ReasoningConfig) -> bool {
        self.needs_more_reasoning(config.confidence_threshold, config.max_passes)
    }

    /// Move into a terminal state chosen by the orchestrator.
    pub fn conclude(&mut self, state: MemoryState) -> Result<()> {
        if !state.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "{:?} is not a terminal state",
                state
            )));
        }
        if let Some(active) = &self.active_pass {
            return Err(CoreError::PassAlreadyActive(active.pass_number));
        }
        if self.state.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "already concluded as {:?}",
                self.state
            )));
        }

        info!(event = %self.event.source_id, state = ?state, "Working memory concluded");
        self.state = state;
        self.touch();
        Ok(())
    }

    // ── Context, questions, continuity ──────────────────────────────────

    /// Append a context item. No deduplication happens here.
    pub fn add_context(&mut self, item: ContextItem) {
        self.context.push(item);
        self.touch();
    }

    pub fn add_context_simple(
        &mut self,
        source: impl Into<String>,
        content: impl Into<String>,
        relevance: f32,
    ) {
        self.add_context(ContextItem::new(source, "note", content, relevance));
    }

    /// Up to `n` context items, most relevant first.
    pub fn get_top_context(&self, n: usize) -> Vec<&ContextItem> {
        let mut ranked: Vec<&ContextItem> = self.context.iter().collect();
        ranked.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }

    /// Record an open question. Also noted on the open pass, if any.
    /// Returns false if the question was already recorded.
    pub fn add_question(&mut self, question: impl Into<String>) -> bool {
        let question = question.into();
        if let Some(active) = self.active_pass.as_mut() {
            push_unique(&mut active.questions_raised, question.clone());
        }
        let added = push_unique(&mut self.questions, question);
        self.touch();
        added
    }

    pub fn add_uncertainty(&mut self, uncertainty: impl Into<String>) -> bool {
        let added = push_unique(&mut self.uncertainties, uncertainty.into());
        self.touch();
        added
    }

    /// Mark this memory as continuing `conversation_id`, keeping the events
    /// that were consulted.
    pub fn set_continuous(
        &mut self,
        conversation_id: impl Into<String>,
        previous_events: Vec<PerceivedEvent>,
    ) {
        self.is_continuous = true;
        self.conversation_id = Some(conversation_id.into());
        self.previous_events = previous_events;
        self.touch();
    }

    // ── Read-only projections ───────────────────────────────────────────

    /// Confidence before the first pass followed by each pass's output.
    pub fn confidence_trajectory(&self) -> Vec<f32> {
        let mut trajectory = Vec::with_capacity(self.reasoning_passes.len() + 1);
        if let Some(first) = self.reasoning_passes.first() {
            trajectory.push(first.input_confidence);
        }
        trajectory.extend(self.reasoning_passes.iter().map(|p| p.output_confidence));
        trajectory
    }

    pub fn get_reasoning_summary(&self) -> ReasoningSummary {
        ReasoningSummary {
            event_source_id: self.event.source_id.clone(),
            state: self.state,
            overall_confidence: self.overall_confidence,
            passes_completed: self.reasoning_passes.len(),
            pass_active: self.active_pass.is_some(),
            best_hypothesis: self.current_best_hypothesis().cloned(),
            hypothesis_count: self.hypotheses.len(),
            context_count: self.context.len(),
            open_questions: self.questions.clone(),
            uncertainties: self.uncertainties.clone(),
            is_continuous: self.is_continuous,
            conversation_id: self.conversation_id.clone(),
            confidence_trajectory: self.confidence_trajectory(),
            total_reasoning_ms: self.reasoning_passes.iter().map(|p| p.duration_ms()).sum(),
        }
    }

    /// Full state as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Format the memory as a prompt block for the external reasoning model.
    pub fn render_prompt_context(&self, top_n: usize) -> String {
        let mut prompt = String::new();

        prompt.push_str("## Current Event\n");
        if !self.event.title.is_empty() {
            prompt.push_str(&self.event.title);
            prompt.push('\n');
        }
        if !self.event.content.is_empty() {
            prompt.push_str(&self.event.content);
            prompt.push('\n');
        }
        prompt.push('\n');

        if self.is_continuous {
            prompt.push_str(&format!(
                "Continues conversation {} ({} earlier events)\n\n",
                self.conversation_id.as_deref().unwrap_or("unknown"),
                self.previous_events.len()
            ));
        }

        let hypotheses = self.get_top_hypotheses(top_n);
        if !hypotheses.is_empty() {
            prompt.push_str("## Hypotheses\n");
            for h in hypotheses {
                prompt.push_str(&format!(
                    "- [{}] {} (confidence {:.2}, evidence +{}/-{})\n",
                    h.id,
                    h.description,
                    h.confidence(),
                    h.supporting_evidence.len(),
                    h.contradicting_evidence.len()
                ));
            }
            prompt.push('\n');
        }

        let context = self.get_top_context(top_n);
        if !context.is_empty() {
            prompt.push_str("## Relevant Background\n");
            for item in context {
                prompt.push_str(&format!(
                    "- ({:.2}) {}\n",
                    item.relevance_score, item.content
                ));
            }
            prompt.push('\n');
        }

        if !self.questions.is_empty() {
            prompt.push_str("## Open Questions\n");
            for q in &self.questions {
                prompt.push_str(&format!("- {}\n", q));
            }
            prompt.push('\n');
        }

        if !self.uncertainties.is_empty() {
            prompt.push_str("## Uncertainties\n");
            for u in &self.uncertainties {
                prompt.push_str(&format!("- {}\n", u));
            }
            prompt.push('\n');
        }

        prompt
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
