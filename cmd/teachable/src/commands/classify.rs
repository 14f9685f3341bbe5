//! Batch classification.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use teachable_session::{Frame, Prediction, Session};
use tracing::{info, warn};

use super::{
    ExampleRecord, QueryRecord, new_session, output_result, read_jsonl, session_config,
    teach_all,
};
use crate::Cli;

/// Teach the examples, then classify every query.
#[derive(Args)]
pub struct ClassifyCommand {
    /// Labeled examples (JSON Lines)
    #[arg(short = 'e', long)]
    examples: PathBuf,

    /// Queries to classify (JSON Lines)
    #[arg(short = 'q', long)]
    queries: PathBuf,
}

/// Outcome for one query line. `prediction` is absent when the query could
/// not be embedded or was rejected; `error` then says why.
#[derive(Debug, Serialize)]
struct QueryResult {
    id: String,
    prediction: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ClassifyCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let session = new_session(session_config(cli)?)?;

        let examples: Vec<ExampleRecord> = read_jsonl(&self.examples)?;
        let rejected = teach_all(&session, &examples).await?;
        info!(
            "taught {} examples ({} rejected)",
            session.store().total_examples(),
            rejected
        );

        let queries: Vec<QueryRecord> = read_jsonl(&self.queries)?;
        let results = classify_all(&session, queries).await?;
        output_result(&results, cli.json)
    }
}

/// Classifies each query on its own. A rejected query (degenerate vector,
/// wrong dimension) is reported in its result and does not stop the batch.
async fn classify_all(
    session: &Session,
    queries: Vec<QueryRecord>,
) -> anyhow::Result<Vec<QueryResult>> {
    let mut results = Vec::with_capacity(queries.len());
    for (i, q) in queries.into_iter().enumerate() {
        let id = if q.id.is_empty() {
            format!("#{}", i + 1)
        } else {
            q.id
        };
        let result = match session.classify(&Frame::from_embedding(&q.embedding)).await {
            Ok(prediction) => QueryResult {
                id,
                prediction,
                error: None,
            },
            Err(e) if e.is_recoverable() => {
                warn!("query {} rejected: {}", id, e);
                QueryResult {
                    id,
                    prediction: None,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => return Err(e.into()),
        };
        results.push(result);
    }
    Ok(results)
}
