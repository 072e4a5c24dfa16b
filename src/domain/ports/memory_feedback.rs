//! In-memory `FeedbackStore` implementation.
//!
//! Useful for tests and for running the engine without a database. The
//! statistics merge happens under a single lock acquisition, satisfying
//! the atomic-increment contract.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::PersistenceError;
use crate::domain::models::{FeedbackRecord, StatKey, StrategyStatistics};

use super::feedback_store::FeedbackStore;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<FeedbackRecord>,
    statistics: BTreeMap<StatKey, StrategyStatistics>,
}

/// Process-local feedback store backed by a `Mutex`.
#[derive(Debug, Default)]
pub struct InMemoryFeedbackStore {
    inner: Mutex<Inner>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended records across all sessions.
    pub fn record_count(&self) -> usize {
        self.inner.lock().expect("feedback store poisoned").records.len()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn append(&self, record: FeedbackRecord) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().expect("feedback store poisoned");
        inner.records.push(record);
        Ok(())
    }

    async fn increment_statistics(
        &self,
        strategy_id: &str,
        failure_type: &str,
        success: bool,
        score_improvement: f64,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().expect("feedback store poisoned");
        let bucket = inner
            .statistics
            .entry(StatKey::new(strategy_id, failure_type))
            .or_default();
        bucket.attempts_count += 1;
        if success {
            bucket.successes_count += 1;
        }
        bucket.sum_score_improvement += score_improvement;
        Ok(())
    }

    async fn snapshot_statistics(
        &self,
    ) -> Result<BTreeMap<StatKey, StrategyStatistics>, PersistenceError> {
        let inner = self.inner.lock().expect("feedback store poisoned");
        Ok(inner.statistics.clone())
    }

    async fn records_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        let inner = self.inner.lock().expect("feedback store poisoned");
        Ok(inner
            .records
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Attempt, GenerationParams, Verdict};

    fn record(session_id: Uuid, attempt_index: u32) -> FeedbackRecord {
        let mut attempt = Attempt::new(session_id, attempt_index, GenerationParams::new(), None);
        attempt.verdict = Verdict::Failed;
        FeedbackRecord::from_attempt(&attempt, "topic", "bio")
    }

    #[tokio::test]
    async fn test_append_preserves_session_order() {
        let store = InMemoryFeedbackStore::new();
        let session = Uuid::new_v4();
        let other = Uuid::new_v4();

        store.append(record(session, 1)).await.unwrap();
        store.append(record(other, 1)).await.unwrap();
        store.append(record(session, 2)).await.unwrap();

        let records = store.records_for_session(session).await.unwrap();
        let indexes: Vec<u32> = records.iter().map(|r| r.attempt_index).collect();
        assert_eq!(indexes, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_increment_accumulates() {
        let store = InMemoryFeedbackStore::new();
        store
            .increment_statistics("amplify_voice", "voice_authenticity", true, 1.5)
            .await
            .unwrap();
        store
            .increment_statistics("amplify_voice", "voice_authenticity", false, -0.5)
            .await
            .unwrap();

        let stats = store.snapshot_statistics().await.unwrap();
        let bucket = stats
            .get(&StatKey::new("amplify_voice", "voice_authenticity"))
            .unwrap();
        assert_eq!(bucket.attempts_count, 2);
        assert_eq!(bucket.successes_count, 1);
        assert!((bucket.sum_score_improvement - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_increments_lose_nothing() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryFeedbackStore::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .increment_statistics("vary_structure", "structural_diversity", true, 0.25)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = store.snapshot_statistics().await.unwrap();
        let bucket = stats
            .get(&StatKey::new("vary_structure", "structural_diversity"))
            .unwrap();
        assert_eq!(bucket.successes_count, 32);
        assert_eq!(bucket.attempts_count, 32);
    }
}
