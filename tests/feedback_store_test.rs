//! `SQLite` feedback store integration tests.

mod common;

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use quillgate::domain::models::{
    FeedbackRecord, GenerationParams, ParamValue, StatKey, Verdict,
};
use quillgate::domain::ports::FeedbackStore;

use common::sqlite_store;

fn record(session_id: Uuid, attempt_index: u32, verdict: Verdict) -> FeedbackRecord {
    FeedbackRecord {
        session_id,
        topic_id: "topic-1".to_string(),
        component_kind: "bio".to_string(),
        attempt_index,
        recorded_at: Utc::now(),
        parameters: GenerationParams::new().with("temperature", ParamValue::Number(0.7)),
        dimension_scores: BTreeMap::from([
            ("ai_detection".to_string(), 6.5),
            ("realism".to_string(), 7.0),
        ]),
        failure_type: (verdict == Verdict::Failed).then(|| "ai_detection".to_string()),
        verdict,
        strategy_applied: (attempt_index > 1).then(|| "humanize_phrasing".to_string()),
    }
}

#[tokio::test]
async fn test_append_preserves_order_and_round_trips() {
    let (_dir, store) = sqlite_store().await;
    let session_id = Uuid::new_v4();

    store
        .append(record(session_id, 1, Verdict::Failed))
        .await
        .unwrap();
    store
        .append(record(session_id, 2, Verdict::Passed))
        .await
        .unwrap();
    // records from another session stay invisible
    store
        .append(record(Uuid::new_v4(), 1, Verdict::Passed))
        .await
        .unwrap();

    let records = store.records_for_session(session_id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].attempt_index, 1);
    assert_eq!(records[0].verdict, Verdict::Failed);
    assert_eq!(records[0].failure_type.as_deref(), Some("ai_detection"));
    assert!(records[0].strategy_applied.is_none());

    assert_eq!(records[1].attempt_index, 2);
    assert_eq!(records[1].verdict, Verdict::Passed);
    assert_eq!(
        records[1].strategy_applied.as_deref(),
        Some("humanize_phrasing")
    );
    assert_eq!(records[1].parameters.number("temperature"), Some(0.7));
    assert_eq!(records[1].dimension_scores.get("realism"), Some(&7.0));
}

#[tokio::test]
async fn test_unknown_session_yields_empty() {
    let (_dir, store) = sqlite_store().await;
    let records = store.records_for_session(Uuid::new_v4()).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_increment_creates_then_accumulates() {
    let (_dir, store) = sqlite_store().await;

    store
        .increment_statistics("humanize_phrasing", "ai_detection", true, 2.0)
        .await
        .unwrap();
    store
        .increment_statistics("humanize_phrasing", "ai_detection", false, -0.5)
        .await
        .unwrap();
    store
        .increment_statistics("humanize_phrasing", "tonal_consistency", true, 1.0)
        .await
        .unwrap();

    let snapshot = store.snapshot_statistics().await.unwrap();
    assert_eq!(snapshot.len(), 2);

    let bucket = snapshot
        .get(&StatKey::new("humanize_phrasing", "ai_detection"))
        .unwrap();
    assert_eq!(bucket.attempts_count, 2);
    assert_eq!(bucket.successes_count, 1);
    assert!((bucket.sum_score_improvement - 1.5).abs() < 1e-9);
    assert!((bucket.success_rate() - 0.5).abs() < 1e-9);

    let other = snapshot
        .get(&StatKey::new("humanize_phrasing", "tonal_consistency"))
        .unwrap();
    assert_eq!(other.attempts_count, 1);
    assert_eq!(other.successes_count, 1);
}

#[tokio::test]
async fn test_recent_records_newest_first_with_limit() {
    let (_dir, store) = sqlite_store().await;

    for i in 1..=5 {
        store
            .append(record(Uuid::new_v4(), i, Verdict::Failed))
            .await
            .unwrap();
    }

    let recent = store.recent_records(3).await.unwrap();
    assert_eq!(recent.len(), 3);
    // newest rows come back first
    assert_eq!(recent[0].attempt_index, 5);
    assert_eq!(recent[2].attempt_index, 3);
}
