//! Port for the durable feedback store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::PersistenceError;
use crate::domain::models::{FeedbackRecord, StatKey, StrategyStatistics};

/// Durable log of every attempt plus incrementally maintained aggregate
/// statistics per (strategy, failure type).
///
/// `append` is write-once and never mutates prior records.
/// `increment_statistics` is the only mutable operation and must be a
/// single atomic add per key (never read-modify-write across two calls)
/// so concurrent sessions cannot lose increments.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persist one attempt record. Append order per session is preserved
    /// for auditability.
    async fn append(&self, record: FeedbackRecord) -> Result<(), PersistenceError>;

    /// Atomically fold one remediation outcome into the statistics bucket
    /// for `(strategy_id, failure_type)`.
    async fn increment_statistics(
        &self,
        strategy_id: &str,
        failure_type: &str,
        success: bool,
        score_improvement: f64,
    ) -> Result<(), PersistenceError>;

    /// Immutable copy of all statistics buckets. The selector ranks
    /// against this snapshot and never observes an update mid-ranking.
    async fn snapshot_statistics(
        &self,
    ) -> Result<BTreeMap<StatKey, StrategyStatistics>, PersistenceError>;

    /// All records for a session in append order.
    async fn records_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<FeedbackRecord>, PersistenceError>;
}
