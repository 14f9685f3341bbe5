//! Utility functions for CLI commands.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use teachable_session::{Frame, PrecomputedExtractor, Session, SessionConfig};
use tracing::warn;

use crate::Cli;

/// One labeled example line.
#[derive(Debug, Deserialize)]
pub struct ExampleRecord {
    pub label: String,
    pub embedding: Vec<f32>,
}

/// One query line. `id` is echoed back in the output.
#[derive(Debug, Deserialize)]
pub struct QueryRecord {
    #[serde(default)]
    pub id: String,
    pub embedding: Vec<f32>,
}

/// Reads a JSON Lines file. Blank lines and lines starting with `#` are
/// ignored.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open {}", path.display()))?;
    parse_jsonl(BufReader::new(file)).with_context(|| format!("read {}", path.display()))
}

pub fn parse_jsonl<T: DeserializeOwned>(reader: impl BufRead) -> anyhow::Result<Vec<T>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let record =
            serde_json::from_str(line).with_context(|| format!("line {}", i + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Loads the session config from `--config` (or defaults) and applies `-k`.
pub fn session_config(cli: &Cli) -> anyhow::Result<SessionConfig> {
    let mut cfg = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(k) = cli.k {
        cfg = cfg.with_k(k);
    }
    Ok(cfg)
}

/// Creates a session whose frames carry pre-extracted embeddings.
pub fn new_session(cfg: SessionConfig) -> anyhow::Result<Session> {
    Ok(Session::new(cfg, Arc::new(PrecomputedExtractor::new(0)))?)
}

/// Teaches every example, skipping (and counting) the ones the store
/// rejects.
pub async fn teach_all(session: &Session, examples: &[ExampleRecord]) -> anyhow::Result<usize> {
    let mut rejected = 0;
    for (i, ex) in examples.iter().enumerate() {
        match session
            .teach(&ex.label, &Frame::from_embedding(&ex.embedding))
            .await
        {
            Ok(true) => {}
            Ok(false) => rejected += 1,
            Err(e) if e.is_recoverable() => {
                warn!("example {} ({}) skipped: {}", i + 1, ex.label, e);
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(rejected)
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)?
    } else {
        serde_yaml::to_string(result)?
    };
    println!("{}", output.trim_end());
    Ok(())
}
