//! End-to-end exercises of the substrate as an orchestrator would drive it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use event_model::{Entity, EventKind, EventTime, PerceivedEvent};
use reasoning_core::{
    ContextEngine, ContextEngineConfig, ContinuityConfig, ContinuityDetector, CoreError,
    DistanceMetric, Document, Hypothesis, InMemoryKnowledgeBase, KnowledgeBase,
    KnowledgeBaseError, MemoryState, PassType, ReasoningConfig, ScoredDocument, Strategy,
    SubstrateConfig, WorkingMemory,
};

fn at(day: u32, hour: u32) -> EventTime {
    EventTime::from(Utc.with_ymd_and_hms(2024, 9, day, hour, 0, 0).unwrap())
}

fn knowledge_base() -> InMemoryKnowledgeBase {
    let mut kb = InMemoryKnowledgeBase::new();
    kb.add_document(
        Document::new("Dana owns the vendor contract renewal")
            .with_title("Vendor contract")
            .with_entity(&Entity::person("Dana"))
            .with_salience(0.8),
    );
    kb.add_document(
        Document::new("The vendor contract renewal is due end of September")
            .with_title("Renewal deadline")
            .with_thread_id("thread-vendor"),
    );
    kb.add_document(Document::new("Office plants are watered on Mondays"));
    kb
}

#[tokio::test]
async fn test_full_reasoning_loop() {
    let config = SubstrateConfig::default();
    let detector = ContinuityDetector::new(config.continuity.clone()).unwrap();
    let engine = ContextEngine::new(Arc::new(knowledge_base()), config.context.clone()).unwrap();

    let earlier = PerceivedEvent::new("msg-1", EventKind::Email, at(10, 9))
        .with_from("dana@example.com")
        .with_to(["me@example.com"])
        .with_title("Vendor contract renewal")
        .with_thread_id("thread-vendor");
    let current = PerceivedEvent::new("msg-2", EventKind::Email, at(10, 10))
        .with_from("dana@example.com")
        .with_to(["me@example.com"])
        .with_title("Re: Vendor contract renewal")
        .with_content("Can you confirm the vendor contract renewal?")
        .with_thread_id("thread-vendor")
        .with_entity(Entity::person("Dana"));

    // Continuity
    let score = detector
        .detect_continuity(&current, std::slice::from_ref(&earlier))
        .unwrap();
    assert!(score.is_continuous);
    assert!(score.explicit_thread_match);

    let mut memory = WorkingMemory::new(current.clone());
    memory.set_continuous("thread-vendor", vec![earlier.clone()]);

    // Reasoning loop
    let reasoning = ReasoningConfig::default();
    let mut pass_number = 0;
    while memory.needs_more_reasoning_with(&reasoning) {
        pass_number += 1;
        let pass_type = if pass_number == 1 {
            PassType::Initial
        } else {
            PassType::ContextGathering
        };
        memory.start_reasoning_pass(pass_number, pass_type).unwrap();

        if pass_number == 1 {
            memory.add_hypothesis(
                Hypothesis::new("confirm", "Sender wants confirmation of the renewal", 0.5)
                    .unwrap(),
            );
            memory.update_confidence(0.5).unwrap();
            memory.add_question("Who signs off on renewals?");
        } else {
            let result = engine.retrieve_into(&mut memory, 5, 0.05).await;
            assert!(!result.is_timed_out());
            memory.update_hypothesis_confidence("confirm", 0.9).unwrap();
            memory.update_confidence(0.9).unwrap();
        }

        memory.complete_reasoning_pass().unwrap();
    }
    memory.conclude(MemoryState::Converged).unwrap();

    assert_eq!(memory.state(), MemoryState::Converged);
    assert_eq!(memory.reasoning_passes().len(), 2);
    assert!(!memory.context().is_empty());
    assert!(memory
        .context()
        .iter()
        .all(|item| !item.content.contains("plants")));

    let summary = memory.get_reasoning_summary();
    assert_eq!(summary.confidence_trajectory, vec![0.0, 0.5, 0.9]);
    assert_eq!(summary.best_hypothesis.unwrap().id, "confirm");
    assert!(summary.is_continuous);

    let prompt = memory.render_prompt_context(3);
    assert!(prompt.contains("Vendor contract renewal"));
    assert!(prompt.contains("Who signs off on renewals?"));
}

#[tokio::test]
async fn test_loop_exhausts_passes() {
    let event = PerceivedEvent::new("msg-1", EventKind::Chat, at(11, 9)).with_content("hmm?");
    let mut memory = WorkingMemory::new(event);
    let reasoning = ReasoningConfig {
        confidence_threshold: 0.85,
        max_passes: 3,
    };

    let mut pass_number = 0;
    while memory.needs_more_reasoning_with(&reasoning) {
        pass_number += 1;
        memory
            .start_reasoning_pass(pass_number, PassType::Refinement)
            .unwrap();
        memory.update_confidence(0.2).unwrap();
        memory.complete_reasoning_pass().unwrap();
    }

    assert_eq!(pass_number, 3);
    memory.conclude(MemoryState::Exhausted).unwrap();
    assert_eq!(memory.state(), MemoryState::Exhausted);
}

/// Sleeps inside every query to simulate a stalled store.
struct StalledKnowledgeBase {
    delay: Duration,
}

impl KnowledgeBase for StalledKnowledgeBase {
    fn metric(&self) -> DistanceMetric {
        DistanceMetric::Cosine
    }

    fn search_by_entity(
        &self,
        _entity: &Entity,
        _limit: usize,
    ) -> Result<Vec<ScoredDocument>, KnowledgeBaseError> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }

    fn search(&self, query: &str, _limit: usize) -> Result<Vec<ScoredDocument>, KnowledgeBaseError> {
        std::thread::sleep(self.delay);
        Ok(vec![(Document::new(query), 0.9)])
    }
}

#[tokio::test]
async fn test_retrieval_timeout_returns_empty_flagged_result() {
    let config = ContextEngineConfig {
        timeout_seconds: 0.05,
        ..ContextEngineConfig::default()
    };
    let engine = ContextEngine::new(
        Arc::new(StalledKnowledgeBase {
            delay: Duration::from_millis(400),
        }),
        config,
    )
    .unwrap();

    let event = PerceivedEvent::new("msg-1", EventKind::Email, at(12, 9))
        .with_title("Quarterly numbers")
        .with_entity(Entity::organization("Acme"));
    let mut memory = WorkingMemory::new(event);

    let result = engine.retrieve_into(&mut memory, 5, 0.0).await;

    assert!(result.is_timed_out());
    assert!(result.is_empty());
    assert!(result.sources_used.is_empty());
    assert!(memory.context().is_empty());
}

#[tokio::test]
async fn test_retrieval_with_single_worker_completes() {
    let config = ContextEngineConfig {
        max_workers: 1,
        ..ContextEngineConfig::default()
    };
    let engine = ContextEngine::new(Arc::new(knowledge_base()), config).unwrap();

    let event = PerceivedEvent::new("msg-3", EventKind::Email, at(12, 9))
        .with_title("vendor contract")
        .with_thread_id("thread-vendor")
        .with_entity(Entity::person("Dana"));

    let result = engine.retrieve_context(&event, 10, 0.0).await;

    assert!(!result.is_timed_out());
    assert_eq!(
        result.sources_used,
        vec![
            Strategy::Entity.to_string(),
            Strategy::Semantic.to_string(),
            Strategy::Thread.to_string()
        ]
    );
    // Two matching documents, each reported once
    assert_eq!(result.items.len(), 2);
}

#[test]
fn test_conversation_chain_seeds_working_memory() {
    let detector = ContinuityDetector::new(ContinuityConfig::default()).unwrap();

    let history = vec![
        PerceivedEvent::new("a", EventKind::Chat, at(13, 8))
            .with_from("sam")
            .with_title("Offsite planning")
            .with_thread_id("offsite"),
        PerceivedEvent::new("noise", EventKind::Chat, at(13, 8))
            .with_from("lee")
            .with_title("Lunch order"),
        PerceivedEvent::new("b", EventKind::Chat, at(13, 9))
            .with_from("sam")
            .with_title("Offsite planning")
            .with_thread_id("offsite"),
    ];
    let current = PerceivedEvent::new("c", EventKind::Chat, at(13, 10))
        .with_from("sam")
        .with_title("Offsite planning")
        .with_thread_id("offsite");

    let chain = detector.find_conversation_chain(&current, &history, 5).unwrap();
    let ids: Vec<&str> = chain.iter().map(|e| e.source_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let mut memory = WorkingMemory::new(current);
    memory.set_continuous("offsite", chain.into_iter().cloned().collect());
    assert_eq!(memory.previous_events().len(), 2);
}

#[test]
fn test_naive_history_is_rejected() {
    let detector = ContinuityDetector::new(ContinuityConfig::default()).unwrap();
    let naive = chrono::NaiveDate::from_ymd_opt(2024, 9, 13)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();

    let previous = PerceivedEvent::new("old", EventKind::Chat, EventTime::from(naive));
    let current = PerceivedEvent::new("new", EventKind::Chat, at(13, 10));

    let err = detector.detect_continuity(&current, &[previous]).unwrap_err();
    assert!(matches!(err, CoreError::NaiveTimestamp { .. }));
    assert!(err.is_data_integrity());
}
