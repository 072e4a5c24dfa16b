//! `SQLite` implementation of the feedback store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::PersistenceError;
use crate::domain::models::{
    FeedbackRecord, GenerationParams, StatKey, StrategyStatistics, Verdict,
};
use crate::domain::ports::FeedbackStore;

/// Feedback store backed by the `feedback_records` and
/// `strategy_statistics` tables.
///
/// Records are append-only; the monotonic rowid preserves append order
/// within a session. Statistics are folded in with a single upsert per
/// outcome so concurrent sessions never lose increments.
pub struct SqliteFeedbackStore {
    pool: SqlitePool,
}

impl SqliteFeedbackStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent records across all sessions, newest first.
    pub async fn recent_records(
        &self,
        limit: u32,
    ) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT session_id, topic_id, component_kind, attempt_index, recorded_at, \
                    parameters, dimension_scores, failure_type, verdict, strategy_applied \
             FROM feedback_records ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<FeedbackRecord, PersistenceError> {
    let session_id: String = row.get("session_id");
    let session_id = Uuid::parse_str(&session_id)
        .map_err(|e| PersistenceError::ParseError(format!("bad session id: {e}")))?;

    let recorded_at: String = row.get("recorded_at");
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map_err(|e| PersistenceError::ParseError(format!("bad timestamp: {e}")))?
        .with_timezone(&Utc);

    let parameters: String = row.get("parameters");
    let parameters: GenerationParams = serde_json::from_str(&parameters)?;

    let dimension_scores: String = row.get("dimension_scores");
    let dimension_scores: BTreeMap<String, f64> = serde_json::from_str(&dimension_scores)?;

    let verdict: String = row.get("verdict");
    let verdict = Verdict::from_str(&verdict)
        .ok_or_else(|| PersistenceError::ParseError(format!("unknown verdict '{verdict}'")))?;

    let attempt_index: i64 = row.get("attempt_index");
    let attempt_index = u32::try_from(attempt_index)
        .map_err(|e| PersistenceError::ParseError(format!("bad attempt index: {e}")))?;

    Ok(FeedbackRecord {
        session_id,
        topic_id: row.get("topic_id"),
        component_kind: row.get("component_kind"),
        attempt_index,
        recorded_at,
        parameters,
        dimension_scores,
        failure_type: row.get("failure_type"),
        verdict,
        strategy_applied: row.get("strategy_applied"),
    })
}

#[async_trait]
impl FeedbackStore for SqliteFeedbackStore {
    async fn append(&self, record: FeedbackRecord) -> Result<(), PersistenceError> {
        let parameters = serde_json::to_string(&record.parameters)?;
        let dimension_scores = serde_json::to_string(&record.dimension_scores)?;

        sqlx::query(
            "INSERT INTO feedback_records \
             (session_id, topic_id, component_kind, attempt_index, recorded_at, \
              parameters, dimension_scores, failure_type, verdict, strategy_applied) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.session_id.to_string())
        .bind(&record.topic_id)
        .bind(&record.component_kind)
        .bind(i64::from(record.attempt_index))
        .bind(record.recorded_at.to_rfc3339())
        .bind(parameters)
        .bind(dimension_scores)
        .bind(&record.failure_type)
        .bind(record.verdict.as_str())
        .bind(&record.strategy_applied)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_statistics(
        &self,
        strategy_id: &str,
        failure_type: &str,
        success: bool,
        score_improvement: f64,
    ) -> Result<(), PersistenceError> {
        // single upsert keeps the read-modify-write inside the database
        sqlx::query(
            "INSERT INTO strategy_statistics \
             (strategy_id, failure_type, attempts_count, successes_count, sum_score_improvement) \
             VALUES (?, ?, 1, ?, ?) \
             ON CONFLICT (strategy_id, failure_type) DO UPDATE SET \
                attempts_count = attempts_count + 1, \
                successes_count = successes_count + excluded.successes_count, \
                sum_score_improvement = sum_score_improvement + excluded.sum_score_improvement",
        )
        .bind(strategy_id)
        .bind(failure_type)
        .bind(i64::from(success))
        .bind(score_improvement)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn snapshot_statistics(
        &self,
    ) -> Result<BTreeMap<StatKey, StrategyStatistics>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT strategy_id, failure_type, attempts_count, successes_count, \
                    sum_score_improvement \
             FROM strategy_statistics",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let strategy_id: String = row.get("strategy_id");
            let failure_type: String = row.get("failure_type");
            let attempts_count: i64 = row.get("attempts_count");
            let successes_count: i64 = row.get("successes_count");
            let sum_score_improvement: f64 = row.get("sum_score_improvement");

            snapshot.insert(
                StatKey::new(strategy_id, failure_type),
                StrategyStatistics {
                    attempts_count: u64::try_from(attempts_count).unwrap_or(0),
                    successes_count: u64::try_from(successes_count).unwrap_or(0),
                    sum_score_improvement,
                },
            );
        }

        Ok(snapshot)
    }

    async fn records_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT session_id, topic_id, component_kind, attempt_index, recorded_at, \
                    parameters, dimension_scores, failure_type, verdict, strategy_applied \
             FROM feedback_records WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
