//! Implementation of the `quillgate stats` command: the learned
//! per-(strategy, failure type) remediation statistics.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::ports::FeedbackStore;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::database::{DatabaseConnection, SqliteFeedbackStore};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Only show buckets for this failure type
    #[arg(long)]
    pub failure_type: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct StatsRow {
    pub strategy_id: String,
    pub failure_type: String,
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub avg_improvement: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct StatsOutput {
    pub rows: Vec<StatsRow>,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        if self.rows.is_empty() {
            return "No strategy statistics recorded yet.".to_string();
        }

        let mut table = list_table(&[
            "strategy",
            "failure type",
            "attempts",
            "successes",
            "success rate",
            "avg improvement",
        ]);
        for row in &self.rows {
            table.add_row(vec![
                row.strategy_id.clone(),
                row.failure_type.clone(),
                row.attempts.to_string(),
                row.successes.to_string(),
                format!("{:.1}%", row.success_rate * 100.0),
                format!("{:+.2}", row.avg_improvement),
            ]);
        }
        format!("{} statistics bucket(s):\n{table}", self.rows.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: StatsArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let db_url = format!("sqlite:{}", config.database.path);
    let db = DatabaseConnection::new(&db_url, config.database.max_connections)
        .await
        .context("Failed to open database; run `quillgate init` first")?;
    db.migrate().await?;

    let store = SqliteFeedbackStore::new(db.pool().clone());
    let snapshot = store.snapshot_statistics().await?;

    let rows: Vec<StatsRow> = snapshot
        .into_iter()
        .filter(|(key, _)| {
            args.failure_type
                .as_deref()
                .is_none_or(|ft| key.failure_type == ft)
        })
        .map(|(key, stats)| StatsRow {
            strategy_id: key.strategy_id,
            failure_type: key.failure_type,
            attempts: stats.attempts_count,
            successes: stats.successes_count,
            success_rate: stats.success_rate(),
            avg_improvement: stats.avg_improvement(),
        })
        .collect();

    db.close().await;
    output(&StatsOutput { rows }, json_mode);
    Ok(())
}
