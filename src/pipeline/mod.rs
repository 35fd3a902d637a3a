//! Two-stage reranking orchestrator.
//!
//! # Pipeline
//!
//! 1. Score every candidate as a whole document and keep the best K
//!    ([`DocumentStage`]), with the priority-source carve-out
//! 2. Enrich the K survivors with full text, concurrently and per-document
//!    isolated ([`EnrichmentCoordinator`])
//! 3. Split each survivor into passages ([`ContentChunker`])
//! 4. Score every passage and keep the best N ([`ChunkStage`])
//!
//! Any error or panic in steps 1-4 is caught once, here, and replaced by a
//! single-stage ranking of all original candidates with the lexical scorer
//! and quality heuristics. [`RerankEngine::rerank`] therefore always returns
//! a non-empty list for non-empty input.

pub mod chunk_stage;
pub mod document_stage;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;

pub use chunk_stage::ChunkStage;
pub use document_stage::DocumentStage;

use crate::chunker::{ABSTRACT_SECTION, ContentChunker};
use crate::config::RerankConfig;
use crate::enrich::{EnrichmentCoordinator, EnrichmentReport, FullTextSource};
use crate::error::{RerankError, Result};
use crate::remote::RemoteReranker;
use crate::scoring::ScoringService;
use crate::scoring::quality::current_year;
use crate::types::{Candidate, ChunkInfo, RankedResult, ScoreSource};

/// Result of one rerank call with provenance and stage counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankOutcome {
    pub results: Vec<RankedResult>,
    pub candidates_in: usize,
    /// Documents kept by stage 1 (0 when the fallback ran).
    pub documents_selected: usize,
    /// Documents that received new full text.
    pub documents_enriched: usize,
    /// Passages scored by stage 2 (0 when the fallback ran).
    pub chunks_scored: usize,
    pub document_scores: Option<ScoreSource>,
    pub chunk_scores: Option<ScoreSource>,
    /// Whether the single-stage fallback produced `results`.
    pub fallback: bool,
    pub elapsed_ms: u64,
}

struct TwoStage {
    results: Vec<RankedResult>,
    documents_selected: usize,
    enrichment: EnrichmentReport,
    chunks_scored: usize,
    document_scores: ScoreSource,
    chunk_scores: ScoreSource,
}

/// Reusable reranking engine.
///
/// Holds only configuration and client handles, so one instance can serve
/// concurrent calls.
#[derive(Debug, Clone)]
pub struct RerankEngine {
    config: RerankConfig,
    scoring: ScoringService,
    enrichment: EnrichmentCoordinator,
    chunker: ContentChunker,
    document_stage: DocumentStage,
    chunk_stage: ChunkStage,
}

impl RerankEngine {
    /// Build an engine from a validated configuration, without enrichment.
    ///
    /// # Errors
    ///
    /// Returns [`RerankError::Config`] if the configuration is invalid, or
    /// [`RerankError::Http`] if the remote client cannot be built.
    pub fn new(config: RerankConfig) -> Result<Self> {
        config.validate()?;
        let scoring = if config.remote.enabled {
            ScoringService::with_remote(RemoteReranker::new(config.remote.clone())?)
        } else {
            ScoringService::lexical_only()
        };
        Ok(Self {
            scoring,
            enrichment: EnrichmentCoordinator::disabled(),
            chunker: ContentChunker::new(&config.chunking),
            document_stage: DocumentStage::new(
                config.document_stage.clone(),
                config.priority.clone(),
            ),
            chunk_stage: ChunkStage::new(config.chunk_stage.clone()),
            config,
        })
    }

    /// Attach a full-text collaborator. Ignored when enrichment is disabled
    /// in the configuration.
    pub fn with_enrichment(mut self, source: Arc<dyn FullTextSource>) -> Self {
        self.enrichment = EnrichmentCoordinator::new(source, &self.config.enrichment);
        self
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    /// Rank `candidates` for `query` and return the best passages.
    pub async fn rerank(&self, query: &str, candidates: &[Candidate]) -> Vec<RankedResult> {
        self.rerank_detailed(query, candidates).await.results
    }

    /// Like [`rerank`](Self::rerank) but also reports what happened.
    pub async fn rerank_detailed(&self, query: &str, candidates: &[Candidate]) -> RerankOutcome {
        let start = Instant::now();
        let reference_year = self.config.reference_year.unwrap_or_else(current_year);
        tracing::trace!(query, "rerank query");

        let mut outcome = RerankOutcome {
            results: Vec::new(),
            candidates_in: candidates.len(),
            documents_selected: 0,
            documents_enriched: 0,
            chunks_scored: 0,
            document_scores: None,
            chunk_scores: None,
            fallback: false,
            elapsed_ms: 0,
        };
        if candidates.is_empty() {
            return outcome;
        }

        let attempt = AssertUnwindSafe(self.two_stage(query, candidates, reference_year))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RerankError::Pipeline(panic_message(panic.as_ref()))));

        match attempt {
            Ok(two) => {
                outcome.results = two.results;
                outcome.documents_selected = two.documents_selected;
                outcome.documents_enriched = two.enrichment.enriched;
                outcome.chunks_scored = two.chunks_scored;
                outcome.document_scores = Some(two.document_scores);
                outcome.chunk_scores = Some(two.chunk_scores);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    candidates = candidates.len(),
                    "two-stage rerank failed, using single-stage fallback"
                );
                outcome.results = self.single_stage(query, candidates, reference_year);
                outcome.document_scores = Some(ScoreSource::Lexical);
                outcome.fallback = true;
            }
        }

        outcome.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            candidates = outcome.candidates_in,
            documents = outcome.documents_selected,
            enriched = outcome.documents_enriched,
            chunks = outcome.chunks_scored,
            results = outcome.results.len(),
            fallback = outcome.fallback,
            elapsed_ms = outcome.elapsed_ms,
            "rerank complete"
        );
        outcome
    }

    async fn two_stage(
        &self,
        query: &str,
        candidates: &[Candidate],
        reference_year: i32,
    ) -> Result<TwoStage> {
        // 1. Document triage.
        let (selected, document_scores) = self
            .document_stage
            .run(&self.scoring, query, candidates, reference_year)
            .await;
        if selected.is_empty() {
            return Err(RerankError::Pipeline("document stage selected nothing".into()));
        }
        let documents_selected = selected.len();

        // 2. Full-text enrichment of the survivors.
        let (doc_scores, survivors): (Vec<f64>, Vec<Candidate>) = selected
            .into_iter()
            .map(|d| (d.combined_score, d.candidate))
            .unzip();
        let (enriched, enrichment) = self.enrichment.enrich_all(query, survivors).await;

        // 3. Chunking.
        let chunks: Vec<_> = enriched
            .iter()
            .zip(doc_scores)
            .flat_map(|(candidate, score)| self.chunker.chunk_candidate(candidate, score))
            .collect();
        if chunks.is_empty() {
            return Err(RerankError::Chunking(format!(
                "no passages from {documents_selected} documents"
            )));
        }
        let chunks_scored = chunks.len();

        // 4. Passage scoring and final cut.
        let (results, chunk_scores) = self
            .chunk_stage
            .run(&self.scoring, query, chunks, reference_year)
            .await;

        Ok(TwoStage {
            results,
            documents_selected,
            enrichment,
            chunks_scored,
            document_scores,
            chunk_scores,
        })
    }

    /// Rank the original candidates directly with the lexical scorer,
    /// quality heuristics and priority boost. No network, no chunking.
    fn single_stage(
        &self,
        query: &str,
        candidates: &[Candidate],
        reference_year: i32,
    ) -> Vec<RankedResult> {
        let texts: Vec<String> = candidates
            .iter()
            .map(|c| self.document_stage.composite_text(c))
            .collect();
        let semantic = self.scoring.lexical().score_all(query, &texts);
        let mut scored = self
            .document_stage
            .combine(candidates, &semantic, reference_year);
        document_stage::sort_documents(&mut scored);
        scored.truncate(self.config.chunk_stage.top_n);

        scored
            .into_iter()
            .enumerate()
            .map(|(i, d)| RankedResult {
                rank: i + 1,
                score: d.combined_score,
                source: d.candidate.source,
                id: d.candidate.id,
                title: d.candidate.title,
                text: d.candidate.text,
                metadata: d.candidate.metadata,
                chunk_info: ChunkInfo {
                    section: ABSTRACT_SECTION.to_owned(),
                    chunk_index: 0,
                },
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned());
    format!("panicked: {detail}")
}
