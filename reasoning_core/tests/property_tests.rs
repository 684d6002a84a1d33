use proptest::prelude::*;

use chrono::{Duration, TimeZone, Utc};
use event_model::{Entity, EventKind, EventTime, PerceivedEvent};
use reasoning_core::{
    rank_candidates, ContextItem, ContinuityConfig, ContinuityDetector, ContinuitySignal,
    Document, Strategy, WeightSet,
};

fn event(source: &str, minutes: i64, from: &str, title: &str) -> PerceivedEvent {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    PerceivedEvent::new(source, EventKind::Email, EventTime::from(base + Duration::minutes(minutes)))
        .with_from(from)
        .with_title(title)
}

fn strategy_weights() -> WeightSet<Strategy> {
    WeightSet::new([
        (Strategy::Entity, 0.4),
        (Strategy::Semantic, 0.4),
        (Strategy::Thread, 0.2),
    ])
    .unwrap()
}

fn candidates(scores: &[(u8, f32)]) -> Vec<(Strategy, ContextItem)> {
    scores
        .iter()
        .map(|&(s, relevance)| {
            let strategy = match s % 3 {
                0 => Strategy::Entity,
                1 => Strategy::Semantic,
                _ => Strategy::Thread,
            };
            let item = ContextItem::from_document(Document::new("doc"), strategy, relevance);
            (strategy, item)
        })
        .collect()
}

proptest! {
    #[test]
    fn test_continuity_score_is_bounded(
        gap_minutes in 0i64..5000,
        same_sender in any::<bool>(),
        title_a in "[a-z ]{0,20}",
        title_b in "[a-z ]{0,20}",
        shared_entity in any::<bool>(),
    ) {
        let detector = ContinuityDetector::new(ContinuityConfig::default()).unwrap();

        let mut previous = event("prev", 0, "ana", &title_a);
        let sender = if same_sender { "ana" } else { "bo" };
        let mut current = event("cur", gap_minutes, sender, &title_b);
        if shared_entity {
            previous = previous.with_entity(Entity::topic("budget"));
            current = current.with_entity(Entity::topic("budget"));
        }

        let score = detector.detect_continuity(&current, &[previous]).unwrap();

        prop_assert!((0.0..=1.0).contains(&score.overall_score));
        for s in [
            score.time_proximity_score,
            score.participant_overlap_score,
            score.topic_similarity_score,
            score.entity_overlap_score,
        ] {
            prop_assert!((0.0..=1.0).contains(&s));
        }
        prop_assert_eq!(
            score.is_continuous,
            score.overall_score >= detector.continuity_threshold()
        );
    }

    #[test]
    fn test_shared_thread_always_continuous(
        gap_minutes in 0i64..100_000,
        title_a in "[a-z]{1,12}",
        title_b in "[a-z]{1,12}",
    ) {
        let detector = ContinuityDetector::new(ContinuityConfig::default()).unwrap();
        let previous = event("prev", 0, "ana", &title_a).with_thread_id("t-1");
        let current = event("cur", gap_minutes, "zed", &title_b).with_thread_id("t-1");

        let score = detector.detect_continuity(&current, &[previous]).unwrap();

        prop_assert_eq!(score.overall_score, 1.0);
        prop_assert!(score.is_continuous);
    }

    #[test]
    fn test_raising_min_relevance_never_adds_items(
        scores in prop::collection::vec((0u8..3, 0.0f32..=1.0), 0..30),
        low in 0.0f32..=1.0,
        bump in 0.0f32..=1.0,
    ) {
        let weights = strategy_weights();
        let high = (low + bump).min(1.0);

        let loose = rank_candidates(candidates(&scores), &weights, 100, low);
        let strict = rank_candidates(candidates(&scores), &weights, 100, high);

        prop_assert!(strict.len() <= loose.len());
        for pair in loose.windows(2) {
            prop_assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        prop_assert!(loose.iter().all(|item| item.relevance_score >= low));
    }

    #[test]
    fn test_weight_sets_validate_sum(
        a in 0.0f32..=1.0,
        b in 0.0f32..=1.0,
        c in 0.0f32..=1.0,
        d in 0.0f32..=1.0,
    ) {
        let sum = a + b + c + d;
        let result = WeightSet::new([
            (ContinuitySignal::TimeProximity, a),
            (ContinuitySignal::ParticipantOverlap, b),
            (ContinuitySignal::TopicSimilarity, c),
            (ContinuitySignal::EntityOverlap, d),
        ]);

        if (sum - 1.0).abs() > 0.011 {
            prop_assert!(result.is_err());
        } else if (sum - 1.0).abs() < 0.009 {
            let weights = result.unwrap();
            prop_assert!((weights.total() - 1.0).abs() <= 0.01);
        }
    }
}
