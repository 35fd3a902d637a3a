//! Stage 1: score whole documents and keep the best K.
//!
//! ```text
//! combined = clamp(semantic_weight * semantic + quality_weight * quality + boost, 0, 1)
//! ```
//!
//! `boost` is the configured priority boost for candidates from the priority
//! source and zero otherwise. Selection reserves up to `cap` slots for the
//! priority source, fills the rest from everyone else, backfills from the
//! priority overflow if that still leaves room, then re-sorts globally.

use std::cmp::Ordering;

use crate::config::{DocumentStageConfig, PriorityConfig};
use crate::scoring::ScoringService;
use crate::scoring::quality::document_boost;
use crate::text::truncate_chars;
use crate::types::{Candidate, ScoreSource, ScoredDocument};

#[derive(Debug, Clone)]
pub struct DocumentStage {
    config: DocumentStageConfig,
    priority: PriorityConfig,
}

impl DocumentStage {
    pub fn new(config: DocumentStageConfig, priority: PriorityConfig) -> Self {
        Self { config, priority }
    }

    /// Title on the first line, truncated body after it.
    pub fn composite_text(&self, candidate: &Candidate) -> String {
        let body = truncate_chars(candidate.text.trim(), self.config.max_body_chars);
        format!("{}\n{}", candidate.title.trim(), body)
    }

    /// Score and select. Returns at most `top_k` documents, best first.
    pub async fn run(
        &self,
        scoring: &ScoringService,
        query: &str,
        candidates: &[Candidate],
        reference_year: i32,
    ) -> (Vec<ScoredDocument>, ScoreSource) {
        let texts: Vec<String> = candidates.iter().map(|c| self.composite_text(c)).collect();
        let batch = scoring.score("document", query, &texts).await;
        let scored = self.combine(candidates, &batch.scores, reference_year);
        let selected = self.select(scored);

        tracing::debug!(
            stage = "document",
            scored = candidates.len(),
            selected = selected.len(),
            priority = selected
                .iter()
                .filter(|d| d.candidate.is_from(self.priority.source.as_deref()))
                .count(),
            source = %batch.source,
            "document stage complete"
        );
        (selected, batch.source)
    }

    /// Fuse semantic scores with quality and priority, in input order.
    ///
    /// A missing semantic score counts as 0.
    pub fn combine(
        &self,
        candidates: &[Candidate],
        semantic: &[f64],
        reference_year: i32,
    ) -> Vec<ScoredDocument> {
        candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let semantic_score = semantic.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let quality_boost = document_boost(candidate, reference_year);
                let boost = if candidate.is_from(self.priority.source.as_deref()) {
                    self.priority.boost
                } else {
                    0.0
                };
                let combined_score = (self.config.semantic_weight * semantic_score
                    + self.config.quality_weight * quality_boost
                    + boost)
                    .clamp(0.0, 1.0);
                ScoredDocument {
                    candidate: candidate.clone(),
                    semantic_score,
                    quality_boost,
                    combined_score,
                }
            })
            .collect()
    }

    /// Top-K selection with the priority carve-out.
    pub fn select(&self, scored: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
        let k = self.config.top_k;
        let source = self.priority.source.as_deref();
        let (mut preferred, mut others): (Vec<_>, Vec<_>) = scored
            .into_iter()
            .partition(|d| d.candidate.is_from(source));
        sort_documents(&mut preferred);
        sort_documents(&mut others);

        let reserved = self.priority.cap.min(k).min(preferred.len());
        let overflow = preferred.split_off(reserved);
        let mut selected = preferred;

        let room = k.saturating_sub(selected.len());
        selected.extend(others.into_iter().take(room));
        let room = k.saturating_sub(selected.len());
        selected.extend(overflow.into_iter().take(room));

        sort_documents(&mut selected);
        selected.truncate(k);
        selected
    }
}

/// Stable descending sort by combined score.
pub fn sort_documents(docs: &mut [ScoredDocument]) {
    docs.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
    });
}
