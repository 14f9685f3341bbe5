//! Store summary.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::{ExampleRecord, new_session, output_result, read_jsonl, session_config, teach_all};
use crate::Cli;

/// Teach the examples and report what the store holds.
#[derive(Args)]
pub struct StatsCommand {
    /// Labeled examples (JSON Lines)
    #[arg(short = 'e', long)]
    examples: PathBuf,
}

#[derive(Debug, Serialize)]
struct ClassCount {
    label: String,
    count: usize,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    dimension: Option<usize>,
    total: usize,
    rejected: usize,
    k: usize,
    classes: Vec<ClassCount>,
}

impl StatsCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let session = new_session(session_config(cli)?)?;
        let examples: Vec<ExampleRecord> = read_jsonl(&self.examples)?;
        let rejected = teach_all(&session, &examples).await?;

        let report = session.store().read(|store| StatsReport {
            dimension: store.dimension(),
            total: store.total_examples(),
            rejected,
            k: session.k(),
            classes: store
                .labels()
                .map(|label| ClassCount {
                    label: label.to_string(),
                    count: store.count_for(label),
                })
                .collect(),
        });

        output_result(&report, cli.json)
    }
}
