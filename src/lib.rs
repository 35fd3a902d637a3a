//! Evidence reranking: two-stage relevance ranking of retrieved documents.
//!
//! Takes a query plus a few dozen to a few hundred candidate evidence
//! records and returns the top-N passages most relevant to the query:
//! Candidates → document scoring (top K) → enrichment → chunking → passage
//! scoring (top N) → ranked results.
//!
//! # Architecture
//!
//! - **Scoring**: a remote cross-encoder when enabled and reachable, with a
//!   deterministic lexical scorer for any batch it cannot score
//!   ([`scoring`], [`remote`])
//! - **Quality**: metadata heuristics for authority, study type, journal and
//!   recency ([`scoring::quality`])
//! - **Stages**: document triage with a priority-source carve-out, then
//!   passage re-scoring ([`pipeline`])
//! - **Chunking**: pre-structured, sliding-window or abstract ([`chunker`])
//! - **Enrichment**: optional full-text collaborator ([`enrich`])
//!
//! Ranking never fails for non-empty input: any failure inside the two-stage
//! flow degrades to a single-stage lexical ranking.
//!
//! # Example
//!
//! ```no_run
//! use evidence_rerank::{Candidate, RerankConfig, RerankEngine};
//!
//! # async fn example() -> evidence_rerank::Result<()> {
//! let engine = RerankEngine::new(RerankConfig::default())?;
//! let candidates = vec![Candidate::new(
//!     "pubmed",
//!     "123",
//!     "ACE inhibitors in hypertension",
//!     "A randomized controlled trial of ...",
//! )];
//! for result in engine.rerank("hypertension treatment", &candidates).await {
//!     println!("{} {:.3} {}", result.rank, result.score, result.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod chunker;
pub mod config;
pub mod enrich;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod remote;
pub mod scoring;
pub mod text;
pub mod types;

pub use config::RerankConfig;
pub use enrich::{FullTextSource, NoEnrichment};
pub use error::{RerankError, Result};
pub use pipeline::{RerankEngine, RerankOutcome};
pub use scoring::LexicalScorer;
pub use types::{Candidate, ChunkInfo, ContentChunk, EnrichedContent, RankedResult, ScoreSource};

/// Rank `candidates` for `query` with a one-off engine built from `config`.
///
/// Prefer building one [`RerankEngine`] and reusing it; this constructs a
/// fresh HTTP client and score cache on every call.
///
/// # Errors
///
/// Returns [`RerankError::Config`] if `config` is invalid.
pub async fn rerank(
    query: &str,
    candidates: &[Candidate],
    config: RerankConfig,
) -> Result<Vec<RankedResult>> {
    let engine = RerankEngine::new(config)?;
    Ok(engine.rerank(query, candidates).await)
}
