//! Splits stage-1 documents into bounded passages.
//!
//! Exactly one strategy applies per candidate, first match wins:
//!
//! 1. **Pre-structured**: the candidate carries `content_chunks`; they pass
//!    through with contiguous per-section indices.
//! 2. **Sections**: the candidate carries `full_text_sections`; each section
//!    goes through the sliding-window splitter.
//! 3. **Abstract**: the candidate's text (or title, if the text is blank)
//!    becomes one chunk labelled `abstract`.
//!
//! The sliding window accumulates whole sentences up to `chunk_size`
//! characters, then seeds the next chunk with the trailing `chunk_overlap`
//! characters of the previous one. Sentences longer than the room left after
//! the seed are hard-split, preferring whitespace, so every chunk fits.

use std::collections::HashMap;

use crate::config::ChunkingConfig;
use crate::text::{char_len, tail_chars, truncate_chars};
use crate::types::{Candidate, Chunk};

/// Section label used by the abstract strategy.
pub const ABSTRACT_SECTION: &str = "abstract";
/// Section label for pre-structured chunks that carry none.
const UNLABELLED_SECTION: &str = "body";

/// Which strategy produced a candidate's chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    PreStructured,
    Sections,
    Abstract,
}

impl ChunkStrategy {
    /// Pick the strategy for `candidate`.
    pub fn for_candidate(candidate: &Candidate) -> Self {
        let has_chunks = candidate
            .content_chunks
            .as_ref()
            .is_some_and(|chunks| chunks.iter().any(|c| !c.text.trim().is_empty()));
        if has_chunks {
            return Self::PreStructured;
        }
        let has_sections = candidate
            .full_text_sections
            .as_ref()
            .is_some_and(|sections| sections.values().any(|t| !t.trim().is_empty()));
        if has_sections {
            Self::Sections
        } else {
            Self::Abstract
        }
    }
}

/// Sliding-window content chunker.
#[derive(Debug, Clone, Copy)]
pub struct ContentChunker {
    chunk_size: usize,
    overlap: usize,
}

impl ContentChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            overlap: config.chunk_overlap,
        }
    }

    /// Chunk one candidate, stamping every chunk with `doc_score`.
    pub fn chunk_candidate(&self, candidate: &Candidate, doc_score: f64) -> Vec<Chunk> {
        let make = |section: &str, chunk_index: usize, text: String| Chunk {
            source: candidate.source.clone(),
            id: candidate.id.clone(),
            title: candidate.title.clone(),
            text,
            metadata: candidate.metadata.clone(),
            section: section.to_owned(),
            chunk_index,
            doc_score,
        };

        match ChunkStrategy::for_candidate(candidate) {
            ChunkStrategy::PreStructured => {
                let mut counters: HashMap<String, usize> = HashMap::new();
                candidate
                    .content_chunks
                    .iter()
                    .flatten()
                    .filter(|c| !c.text.trim().is_empty())
                    .map(|c| {
                        let section = match c.section.trim() {
                            "" => UNLABELLED_SECTION,
                            s => s,
                        };
                        let index = counters.entry(section.to_owned()).or_insert(0);
                        let chunk = make(section, *index, c.text.trim().to_owned());
                        *index += 1;
                        chunk
                    })
                    .collect()
            }
            ChunkStrategy::Sections => candidate
                .full_text_sections
                .iter()
                .flatten()
                .flat_map(|(section, text)| {
                    self.split_text(text)
                        .into_iter()
                        .enumerate()
                        .map(|(i, piece)| make(section, i, piece))
                        .collect::<Vec<_>>()
                })
                .collect(),
            ChunkStrategy::Abstract => {
                let text = match candidate.text.trim() {
                    "" => candidate.title.trim(),
                    t => t,
                };
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![make(ABSTRACT_SECTION, 0, text.to_owned())]
                }
            }
        }
    }

    /// Split free text into overlapping passages of at most `chunk_size`
    /// characters. Blank input yields no passages.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let max_unit = self.max_unit_chars();
        let units: Vec<&str> = split_sentences(text)
            .into_iter()
            .flat_map(|s| hard_split(s, max_unit))
            .collect();

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut has_new = false;
        for unit in units {
            let separator = usize::from(!current.is_empty());
            if has_new && char_len(&current) + separator + char_len(unit) > self.chunk_size {
                let seed = tail_chars(&current, self.overlap).trim_start().to_owned();
                chunks.push(std::mem::replace(&mut current, seed));
                has_new = false;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(unit);
            has_new = true;
        }
        if has_new {
            chunks.push(current);
        }
        chunks
    }

    /// Longest unit that always fits after an overlap seed and a separator.
    fn max_unit_chars(&self) -> usize {
        if self.overlap == 0 {
            self.chunk_size
        } else {
            self.chunk_size.saturating_sub(self.overlap + 1).max(1)
        }
    }
}

/// Split at `.`, `!` or `?` followed by whitespace or end of text.
///
/// Text without any boundary comes back as a single unit.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                let end = idx + ch.len_utf8();
                let unit = text[start..end].trim();
                if !unit.is_empty() {
                    units.push(unit);
                }
                start = end;
            }
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        units.push(rest);
    }
    units
}

/// Break `unit` into pieces of at most `max_chars` characters, cutting at the
/// last whitespace inside the window when there is one.
fn hard_split(unit: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest = unit.trim();
    while char_len(rest) > max_chars {
        let window = truncate_chars(rest, max_chars);
        let cut = window
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(window.len());
        let (head, tail) = rest.split_at(cut);
        let head = head.trim_end();
        if !head.is_empty() {
            pieces.push(head);
        }
        rest = tail.trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}
