//! Core records flowing through the reranking pipeline.
//!
//! [`Candidate`] comes in from the upstream normaliser, [`RankedResult`] goes
//! out to synthesis. Everything in between is transient.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, source-specific metadata attached to a candidate.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A normalised evidence record prior to chunking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Source tag, e.g. `pubmed` or `indian_guidelines`.
    pub source: String,
    /// Source-local identifier.
    pub id: String,
    /// Document title.
    pub title: String,
    /// Abstract or snippet text.
    pub text: String,
    /// Source-specific metadata. Only a fixed set of keys is ever read.
    #[serde(default)]
    pub metadata: Metadata,
    /// Whether the upstream source reports full text for this record.
    #[serde(default)]
    pub full_text_available: bool,
    /// Named full-text sections (section name → text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text_sections: Option<BTreeMap<String, String>>,
    /// Pre-structured passages, usually supplied by enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_chunks: Option<Vec<ContentChunk>>,
}

impl Candidate {
    /// Create a candidate with the four mandatory fields.
    pub fn new(
        source: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
            title: title.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Mark full text as available upstream.
    pub fn with_full_text_available(mut self, available: bool) -> Self {
        self.full_text_available = available;
        self
    }

    /// Attach one named full-text section.
    pub fn with_section(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.full_text_sections
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), text.into());
        self
    }

    /// Attach pre-structured content chunks.
    pub fn with_content_chunks(mut self, chunks: Vec<ContentChunk>) -> Self {
        self.content_chunks = Some(chunks);
        self
    }

    /// Returns `true` if this candidate already carries structured or
    /// sectioned full text, i.e. enrichment would add nothing.
    pub fn has_full_content(&self) -> bool {
        let has_chunks = self
            .content_chunks
            .as_ref()
            .is_some_and(|chunks| chunks.iter().any(|c| !c.text.trim().is_empty()));
        let has_sections = self
            .full_text_sections
            .as_ref()
            .is_some_and(|sections| sections.values().any(|t| !t.trim().is_empty()));
        has_chunks || has_sections
    }

    /// Returns `true` if this candidate belongs to the given priority source.
    pub fn is_from(&self, source: Option<&str>) -> bool {
        source.is_some_and(|s| self.source.eq_ignore_ascii_case(s))
    }

    /// Return a copy with enrichment output merged in.
    ///
    /// Enriched fields replace the original ones only when present.
    pub fn with_enrichment(&self, enriched: EnrichedContent) -> Self {
        let mut merged = self.clone();
        if let Some(sections) = enriched.full_text_sections {
            merged.full_text_sections = Some(sections);
            merged.full_text_available = true;
        }
        if let Some(chunks) = enriched.content_chunks {
            merged.content_chunks = Some(chunks);
            merged.full_text_available = true;
        }
        merged
    }
}

/// A pre-structured passage carried on a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    /// Section label, e.g. `results`.
    pub section: String,
    /// Passage text.
    pub text: String,
}

impl ContentChunk {
    pub fn new(section: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            text: text.into(),
        }
    }
}

/// Full-text content returned by an enrichment collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedContent {
    /// Named full-text sections.
    #[serde(default)]
    pub full_text_sections: Option<BTreeMap<String, String>>,
    /// Hierarchical content chunks.
    #[serde(default)]
    pub content_chunks: Option<Vec<ContentChunk>>,
}

/// Which scorer produced a set of semantic scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// The remote cross-encoder service.
    Remote,
    /// The local lexical fallback scorer.
    Lexical,
    /// Remote for some items, lexical for items whose remote batch failed.
    /// Each item still has exactly one source.
    Mixed,
}

impl ScoreSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Lexical => "lexical",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A candidate after stage-1 scoring.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub candidate: Candidate,
    /// Relevance from the remote or lexical scorer, in [0, 1].
    pub semantic_score: f64,
    /// Metadata-derived quality boost, in [0, 1].
    pub quality_boost: f64,
    /// Fused stage-1 score, in [0, 1].
    pub combined_score: f64,
}

/// A bounded passage derived from one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub id: String,
    pub title: String,
    pub text: String,
    pub metadata: Metadata,
    /// Section label (`abstract` for the fallback strategy).
    pub section: String,
    /// 0-based index, contiguous within `section` of one document.
    pub chunk_index: usize,
    /// Stage-1 combined score of the parent document.
    pub doc_score: f64,
}

/// A chunk after stage-2 scoring.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Relevance of the chunk text itself, in [0, 1].
    pub semantic_score: f64,
    /// Chunk-level quality boost, in [0, 1].
    pub quality_boost: f64,
    /// Fused stage-2 score, in [0, 1].
    pub combined_score: f64,
}

/// Where a ranked passage came from inside its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub section: String,
    pub chunk_index: usize,
}

/// A final ranked passage handed to downstream synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// 1-based, contiguous rank (1 = best).
    pub rank: usize,
    /// Final fused score, in [0, 1].
    pub score: f64,
    pub source: String,
    pub id: String,
    pub title: String,
    pub text: String,
    pub metadata: Metadata,
    pub chunk_info: ChunkInfo,
}
