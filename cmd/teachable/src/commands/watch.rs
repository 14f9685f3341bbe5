//! Periodic classification.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use teachable_session::{Frame, QueueSource, Ticker};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    ExampleRecord, QueryRecord, new_session, read_jsonl, session_config, teach_all,
};
use crate::Cli;

/// Teach the examples, then classify one query per tick.
#[derive(Args)]
pub struct WatchCommand {
    /// Labeled examples (JSON Lines)
    #[arg(short = 'e', long)]
    examples: PathBuf,

    /// Frames to classify, one per tick (JSON Lines)
    #[arg(short = 'q', long)]
    queries: PathBuf,

    /// Tick period in milliseconds (overrides the config file)
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl WatchCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = session_config(cli)?;
        if let Some(ms) = self.interval_ms {
            cfg.interval_ms = ms;
            cfg.validate()?;
        }
        let period = cfg.interval();
        let session = Arc::new(new_session(cfg)?);

        let examples: Vec<ExampleRecord> = read_jsonl(&self.examples)?;
        teach_all(&session, &examples).await?;

        let queries: Vec<QueryRecord> = read_jsonl(&self.queries)?;
        let source = Arc::new(QueueSource::new(
            queries.iter().map(|q| Frame::from_embedding(&q.embedding)),
        ));

        let cancel = CancellationToken::new();
        let ticker = Ticker::spawn(session, source, period, cancel.clone());
        let mut rx = ticker.subscribe();

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("ctrl-c handler: {}", e);
                    return;
                }
                info!("interrupted");
                cancel.cancel();
            }
        });

        while rx.changed().await.is_ok() {
            let latest = rx.borrow_and_update().clone();
            if let Some(result) = latest {
                if cli.json {
                    println!("{}", serde_json::to_string(&result)?);
                } else {
                    println!("---\n{}", serde_yaml::to_string(&result)?.trim_end());
                }
            }
        }

        ticker.join().await;
        Ok(())
    }
}
