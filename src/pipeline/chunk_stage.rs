//! Stage 2: score passages and emit the final ranking.
//!
//! ```text
//! combined = chunk_weight * semantic
//!          + document_weight * doc_score
//!          + quality_weight * chunk_quality
//! ```

use std::cmp::Ordering;

use crate::config::ChunkStageConfig;
use crate::scoring::ScoringService;
use crate::scoring::quality::chunk_boost;
use crate::types::{Chunk, ChunkInfo, RankedResult, ScoreSource, ScoredChunk};

#[derive(Debug, Clone)]
pub struct ChunkStage {
    config: ChunkStageConfig,
}

impl ChunkStage {
    pub fn new(config: ChunkStageConfig) -> Self {
        Self { config }
    }

    /// Score every chunk and return the top N as ranked results.
    pub async fn run(
        &self,
        scoring: &ScoringService,
        query: &str,
        chunks: Vec<Chunk>,
        reference_year: i32,
    ) -> (Vec<RankedResult>, ScoreSource) {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batch = scoring.score("chunk", query, &texts).await;
        let total = chunks.len();
        let results = self.rank(self.combine(chunks, &batch.scores, reference_year));

        tracing::debug!(
            stage = "chunk",
            scored = total,
            returned = results.len(),
            source = %batch.source,
            "chunk stage complete"
        );
        (results, batch.source)
    }

    /// Fuse chunk relevance, inherited document score and chunk quality.
    pub fn combine(
        &self,
        chunks: Vec<Chunk>,
        semantic: &[f64],
        reference_year: i32,
    ) -> Vec<ScoredChunk> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let semantic_score = semantic.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let quality_boost = chunk_boost(&chunk, reference_year);
                let combined_score = (self.config.chunk_weight * semantic_score
                    + self.config.document_weight * chunk.doc_score.clamp(0.0, 1.0)
                    + self.config.quality_weight * quality_boost)
                    .clamp(0.0, 1.0);
                ScoredChunk {
                    chunk,
                    semantic_score,
                    quality_boost,
                    combined_score,
                }
            })
            .collect()
    }

    /// Sort descending, keep the top N and assign ranks 1..=N.
    pub fn rank(&self, mut scored: Vec<ScoredChunk>) -> Vec<RankedResult> {
        scored.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(self.config.top_n);
        scored
            .into_iter()
            .enumerate()
            .map(|(i, s)| RankedResult {
                rank: i + 1,
                score: s.combined_score,
                source: s.chunk.source,
                id: s.chunk.id,
                title: s.chunk.title,
                text: s.chunk.text,
                metadata: s.chunk.metadata,
                chunk_info: ChunkInfo {
                    section: s.chunk.section,
                    chunk_index: s.chunk.chunk_index,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    const YEAR: i32 = 2024;

    fn chunk(id: &str, section: &str, text: &str, doc_score: f64) -> Chunk {
        Chunk {
            source: "pubmed".into(),
            id: id.into(),
            title: "t".into(),
            text: text.into(),
            metadata: Metadata::new(),
            section: section.into(),
            chunk_index: 0,
            doc_score,
        }
    }

    fn stage(top_n: usize) -> ChunkStage {
        ChunkStage::new(ChunkStageConfig {
            top_n,
            ..Default::default()
        })
    }

    #[test]
    fn combine_uses_documented_weights() {
        let scored = stage(10).combine(vec![chunk("1", "results", "x", 0.8)], &[0.6], YEAR);
        let q = scored[0].quality_boost;
        let expected = 0.45 * 0.6 + 0.35 * 0.8 + 0.20 * q;
        assert!((scored[0].combined_score - expected).abs() < 1e-9);
    }

    #[test]
    fn results_section_outranks_introduction_all_else_equal() {
        let scored = stage(10).combine(
            vec![chunk("1", "introduction", "x", 0.5), chunk("1", "results", "x", 0.5)],
            &[0.5, 0.5],
            YEAR,
        );
        assert!(scored[1].combined_score > scored[0].combined_score);
    }

    #[test]
    fn rank_truncates_and_numbers_contiguously() {
        let chunks: Vec<Chunk> = (0..15)
            .map(|i| chunk(&i.to_string(), "abstract", "x", i as f64 / 20.0))
            .collect();
        let scores = vec![0.5; 15];
        let stage = stage(10);
        let results = stage.rank(stage.combine(chunks, &scores, YEAR));

        assert_eq!(results.len(), 10);
        assert_eq!(
            results.iter().map(|r| r.rank).collect::<Vec<_>>(),
            (1..=10).collect::<Vec<_>>()
        );
        assert_eq!(results[0].id, "14");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn fewer_chunks_than_n_returns_all() {
        let stage = stage(10);
        let chunks = vec![chunk("1", "results", "x", 0.5)];
        let results = stage.rank(stage.combine(chunks, &[0.5], YEAR));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].chunk_info.section, "results");
    }

    #[tokio::test]
    async fn run_prefers_relevant_passages() {
        let chunks = vec![
            chunk("1", "results", "Statins reduced cardiovascular mortality.", 0.5),
            chunk("2", "results", "The cafeteria menu changed in spring.", 0.5),
        ];
        let (results, source) = stage(10)
            .run(&ScoringService::lexical_only(), "statins cardiovascular mortality", chunks, YEAR)
            .await;
        assert_eq!(source, ScoreSource::Lexical);
        assert_eq!(results[0].id, "1");
    }
}
