//! Relevance and quality scoring.
//!
//! [`ScoringService`] is the single entry point stages use for semantic
//! scores. It asks the remote cross-encoder first; items whose remote batch
//! failed are scored by the [`LexicalScorer`] instead, and every other item
//! keeps its remote score.

pub mod lexical;
pub mod quality;
pub mod synonyms;

pub use lexical::{LexicalScorer, QueryTerms};

use crate::remote::RemoteReranker;
use crate::types::ScoreSource;

/// Semantic scores for one list of texts, plus which scorer produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBatch {
    pub scores: Vec<f64>,
    pub source: ScoreSource,
}

/// Remote-first, lexical-second semantic scorer.
#[derive(Debug, Clone)]
pub struct ScoringService {
    remote: Option<RemoteReranker>,
    lexical: LexicalScorer,
}

impl ScoringService {
    /// A service that only ever uses the lexical scorer.
    pub fn lexical_only() -> Self {
        Self {
            remote: None,
            lexical: LexicalScorer::new(),
        }
    }

    /// A service that tries `remote` before falling back.
    pub fn with_remote(remote: RemoteReranker) -> Self {
        Self {
            remote: Some(remote),
            lexical: LexicalScorer::new(),
        }
    }

    pub fn lexical(&self) -> &LexicalScorer {
        &self.lexical
    }

    /// Score every text against `query`. Never fails; `scores` always has
    /// one entry per text, each in [0, 1], from exactly one scorer per item.
    pub async fn score(&self, stage: &'static str, query: &str, texts: &[String]) -> ScoreBatch {
        let Some(remote) = self.remote.as_ref().filter(|r| r.is_enabled()) else {
            return self.lexical_batch(query, texts);
        };

        let partial = match remote.score_each(query, texts).await {
            Ok(partial) => partial,
            Err(e) => {
                tracing::info!(stage, error = %e, "remote reranker skipped, using lexical scorer");
                return self.lexical_batch(query, texts);
            }
        };

        for failure in &partial.failures {
            if failure.error.is_soft_remote_failure() {
                tracing::info!(
                    stage,
                    items = failure.items.len(),
                    error = %failure.error,
                    "remote batch unavailable, using lexical scorer for its items"
                );
            } else {
                tracing::warn!(
                    stage,
                    items = failure.items.len(),
                    error = %failure.error,
                    "remote batch failed, using lexical scorer for its items"
                );
            }
        }

        let remote_count = partial.scored_count();
        if remote_count == 0 {
            return self.lexical_batch(query, texts);
        }

        let terms = QueryTerms::new(query);
        let scores: Vec<f64> = partial
            .scores
            .into_iter()
            .zip(texts)
            .map(|(score, text)| {
                score.unwrap_or_else(|| self.lexical.score_with_terms(&terms, text))
            })
            .collect();
        let source = if remote_count == texts.len() {
            ScoreSource::Remote
        } else {
            tracing::debug!(
                stage,
                remote = remote_count,
                lexical = texts.len() - remote_count,
                "mixed score provenance"
            );
            ScoreSource::Mixed
        };
        ScoreBatch { scores, source }
    }

    fn lexical_batch(&self, query: &str, texts: &[String]) -> ScoreBatch {
        ScoreBatch {
            scores: self.lexical.score_all(query, texts),
            source: ScoreSource::Lexical,
        }
    }
}
