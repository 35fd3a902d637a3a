//! Command-line harness for the evidence reranker.
//!
//! Reads candidates from a JSON file, reranks them for a query and prints
//! the ranked passages as pretty JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use evidence_rerank::{Candidate, RerankConfig, RerankEngine};
use tracing_subscriber::EnvFilter;

/// Rerank evidence candidates for a query.
#[derive(Parser)]
#[command(name = "rerank-harness", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Query to rank against.
    #[arg(short, long)]
    query: String,

    /// JSON file holding an array of candidates.
    #[arg(long)]
    candidates: PathBuf,

    /// Force remote scoring on.
    #[arg(long, overrides_with = "no_remote")]
    remote: bool,

    /// Force remote scoring off.
    #[arg(long, overrides_with = "remote")]
    no_remote: bool,

    /// Override the number of passages returned.
    #[arg(long)]
    top_n: Option<usize>,

    /// Print stage counts and score provenance along with the results.
    #[arg(long)]
    detailed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("evidence_rerank=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => RerankConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RerankConfig::default(),
    };
    config.apply_env_overrides();
    if cli.remote {
        config.remote.enabled = true;
    }
    if cli.no_remote {
        config.remote.enabled = false;
    }
    if let Some(n) = cli.top_n {
        config.chunk_stage.top_n = n;
    }

    let raw = std::fs::read_to_string(&cli.candidates)
        .with_context(|| format!("failed to read {}", cli.candidates.display()))?;
    let candidates: Vec<Candidate> =
        serde_json::from_str(&raw).context("candidates file must hold a JSON array of candidates")?;

    let engine = RerankEngine::new(config)?;
    let outcome = engine.rerank_detailed(&cli.query, &candidates).await;

    let json = if cli.detailed {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string_pretty(&outcome.results)?
    };
    println!("{json}");
    Ok(())
}
