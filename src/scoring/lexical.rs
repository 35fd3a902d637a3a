//! Deterministic, network-free relevance scorer used when the remote
//! cross-encoder is disabled or unavailable.
//!
//! # Scoring Formula
//!
//! ```text
//! score = clamp(keyword + fuzzy + synonym + bigram + title + richness, 0.05, 1.0)
//!
//! keyword  = 0.35 * |Q ∩ D| / |Q|
//! fuzzy    = 0.15 * |long Q tokens matching a long D token by containment| / |long Q|
//! synonym  = min(0.05 * matched groups, 0.20)
//! bigram   = 0.15 * |Qb ∩ Db| / |Qb|
//! title    = 0.10 * |Q ∩ first line| / |Q|
//! richness = length bucket, up to 0.05
//! ```
//!
//! Tokens are lowercase, punctuation-free, at least 3 characters and not
//! stopwords. "Long" tokens have at least 4 characters. The floor keeps a
//! zero-overlap candidate rankable instead of discarding it outright.

use std::collections::HashSet;

use super::synonyms;
use crate::text::{char_len, normalise_for_matching, truncate_chars};

const KEYWORD_WEIGHT: f64 = 0.35;
const FUZZY_WEIGHT: f64 = 0.15;
const SYNONYM_INCREMENT: f64 = 0.05;
const SYNONYM_CAP: f64 = 0.20;
const BIGRAM_WEIGHT: f64 = 0.15;
const TITLE_WEIGHT: f64 = 0.10;

/// Lowest score the scorer ever returns.
pub const MIN_SCORE: f64 = 0.05;
/// Highest score the scorer ever returns.
pub const MAX_SCORE: f64 = 1.0;

const MIN_TOKEN_CHARS: usize = 3;
const FUZZY_TOKEN_CHARS: usize = 4;
const MAX_TOKENS: usize = 2_000;
const MAX_BIGRAMS: usize = 2_000;
const MAX_TITLE_CHARS: usize = 200;
/// Text beyond this many characters is ignored for matching (not for richness).
const MAX_SCORED_CHARS: usize = 20_000;

/// Richness buckets: `(min chars, bonus)`, checked top-down.
const RICHNESS_BUCKETS: &[(usize, f64)] =
    &[(2_000, 0.05), (1_000, 0.04), (500, 0.03), (200, 0.02), (50, 0.01)];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "been", "being",
    "have", "has", "had", "not", "but", "its", "into", "than", "then", "there", "their", "which",
    "what", "when", "where", "who", "whom", "why", "how", "all", "any", "can", "could", "should",
    "would", "may", "might", "will", "shall", "does", "did", "also", "such", "these", "those",
    "about", "after", "before", "between", "during", "over", "under", "more", "most", "other",
    "some", "only", "same", "very", "our", "your", "you", "they", "them", "his", "her", "she",
    "him", "per", "via", "use", "used", "using", "each", "both", "whether", "within", "without",
];

/// Pre-tokenised query, built once per scoring call.
#[derive(Debug, Clone)]
pub struct QueryTerms {
    tokens: HashSet<String>,
    long_tokens: Vec<String>,
    bigrams: HashSet<String>,
    normalised: String,
}

impl QueryTerms {
    pub fn new(query: &str) -> Self {
        let normalised = normalise_for_matching(query);
        let ordered = tokenize_normalised(&normalised);
        let bigrams = bigrams(&ordered);
        let tokens: HashSet<String> = ordered.into_iter().collect();
        let mut long_tokens: Vec<String> = tokens
            .iter()
            .filter(|t| char_len(t) >= FUZZY_TOKEN_CHARS)
            .cloned()
            .collect();
        long_tokens.sort();
        Self {
            tokens,
            long_tokens,
            bigrams,
            normalised,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// The lexical fallback scorer. Stateless and fully deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer;

impl LexicalScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score one `(query, text)` pair.
    pub fn score(&self, query: &str, text: &str) -> f64 {
        self.score_with_terms(&QueryTerms::new(query), text)
    }

    /// Score many texts against one query, preserving input order.
    pub fn score_all<S: AsRef<str>>(&self, query: &str, texts: &[S]) -> Vec<f64> {
        let terms = QueryTerms::new(query);
        texts
            .iter()
            .map(|t| self.score_with_terms(&terms, t.as_ref()))
            .collect()
    }

    /// Score one text against a pre-tokenised query.
    pub fn score_with_terms(&self, query: &QueryTerms, text: &str) -> f64 {
        let richness = richness_bonus(char_len(text));
        let scored_text = truncate_chars(text, MAX_SCORED_CHARS);
        let normalised = normalise_for_matching(scored_text);
        let ordered = tokenize_normalised(&normalised);
        let doc_bigrams = bigrams(&ordered);
        let doc_tokens: HashSet<String> = ordered.into_iter().collect();

        let keyword = KEYWORD_WEIGHT * overlap_ratio(&query.tokens, &doc_tokens);
        let fuzzy = FUZZY_WEIGHT * fuzzy_ratio(&query.long_tokens, &doc_tokens);
        let synonym = (SYNONYM_INCREMENT
            * synonyms::matched_groups(&query.normalised, &normalised) as f64)
            .min(SYNONYM_CAP);
        let bigram = BIGRAM_WEIGHT * overlap_ratio(&query.bigrams, &doc_bigrams);
        let title = TITLE_WEIGHT * title_ratio(&query.tokens, scored_text);

        (keyword + fuzzy + synonym + bigram + title + richness).clamp(MIN_SCORE, MAX_SCORE)
    }
}

/// Tokenise raw text the same way the scorer does.
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_normalised(&normalise_for_matching(text))
}

fn tokenize_normalised(normalised: &str) -> Vec<String> {
    normalised
        .split_whitespace()
        .filter(|t| char_len(t) >= MIN_TOKEN_CHARS && !STOPWORDS.contains(t))
        .take(MAX_TOKENS)
        .map(str::to_owned)
        .collect()
}

fn bigrams(tokens: &[String]) -> HashSet<String> {
    tokens
        .windows(2)
        .take(MAX_BIGRAMS)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

/// `|a ∩ b| / |a|`, clamped to [0, 1]; 0 when `a` is empty.
fn overlap_ratio(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let hits = a.iter().filter(|t| b.contains(*t)).count();
    (hits as f64 / a.len() as f64).clamp(0.0, 1.0)
}

fn fuzzy_ratio(long_query_tokens: &[String], doc_tokens: &HashSet<String>) -> f64 {
    if long_query_tokens.is_empty() {
        return 0.0;
    }
    let hits = long_query_tokens
        .iter()
        .filter(|q| {
            doc_tokens.contains(*q)
                || doc_tokens.iter().any(|d| {
                    char_len(d) >= FUZZY_TOKEN_CHARS
                        && (d.contains(q.as_str()) || q.contains(d.as_str()))
                })
        })
        .count();
    (hits as f64 / long_query_tokens.len() as f64).clamp(0.0, 1.0)
}

fn title_ratio(query_tokens: &HashSet<String>, text: &str) -> f64 {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let title_tokens: HashSet<String> = tokenize(truncate_chars(first_line, MAX_TITLE_CHARS))
        .into_iter()
        .collect();
    overlap_ratio(query_tokens, &title_tokens)
}

fn richness_bonus(chars: usize) -> f64 {
    RICHNESS_BUCKETS
        .iter()
        .find(|(min, _)| chars >= *min)
        .map_or(0.0, |(_, bonus)| *bonus)
}
