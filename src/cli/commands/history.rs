//! Implementation of the `quillgate history` command: the append-only
//! attempt record log.

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::FeedbackRecord;
use crate::domain::ports::FeedbackStore;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::database::{DatabaseConnection, SqliteFeedbackStore};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show every record of one session, in append order
    #[arg(long)]
    pub session: Option<Uuid>,

    /// Maximum number of records when listing across sessions
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

#[derive(Debug, serde::Serialize)]
pub struct HistoryOutput {
    pub records: Vec<FeedbackRecord>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No feedback records found.".to_string();
        }

        let mut table = list_table(&[
            "recorded",
            "session",
            "kind",
            "attempt",
            "verdict",
            "failure type",
            "strategy",
        ]);
        for record in &self.records {
            let session_short = record.session_id.to_string()[..8].to_string();
            table.add_row(vec![
                record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                session_short,
                record.component_kind.clone(),
                record.attempt_index.to_string(),
                record.verdict.as_str().to_string(),
                record.failure_type.clone().unwrap_or_else(|| "-".to_string()),
                record
                    .strategy_applied
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
            ]);
        }
        format!("{} record(s):\n{table}", self.records.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: HistoryArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let db_url = format!("sqlite:{}", config.database.path);
    let db = DatabaseConnection::new(&db_url, config.database.max_connections)
        .await
        .context("Failed to open database; run `quillgate init` first")?;
    db.migrate().await?;

    let store = SqliteFeedbackStore::new(db.pool().clone());
    let records = match args.session {
        Some(session_id) => store.records_for_session(session_id).await?,
        None => store.recent_records(args.limit).await?,
    };

    db.close().await;
    output(&HistoryOutput { records }, json_mode);
    Ok(())
}
