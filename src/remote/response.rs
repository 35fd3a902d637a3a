//! Response shapes returned by cross-encoder inference services.
//!
//! Services disagree on how they encode one relevance score per input pair,
//! so the body is parsed as a tagged union of known shapes. `serde`'s
//! untagged representation tries the variants top to bottom, which fixes the
//! priority order.
//!
//! # Normalisation
//!
//! Exactly one rule per shape:
//!
//! - [`ClassificationArrays`](RerankResponse::ClassificationArrays),
//!   `[[{"label":"LABEL_1","score":0.9}]]`: relevant label if present, else
//!   the best label; clamp.
//! - [`RawScores`](RerankResponse::RawScores), `[2.3, -1.1]`: sigmoid, since
//!   the values are logits.
//! - [`IndexedScores`](RerankResponse::IndexedScores),
//!   `[{"index":1,"score":0.7}]`: placed by index; clamp.
//! - [`LabelScores`](RerankResponse::LabelScores),
//!   `[{"label":"LABEL_0","score":0.2}]`: clamp.
//! - [`WrappedScores`](RerankResponse::WrappedScores), `{"scores":[0.1, 0.8]}`:
//!   clamp.
//! - [`ServiceError`](RerankResponse::ServiceError),
//!   `{"error":"Model is loading"}`: remote unavailable.
//!
//! Anything else, including a body that is not JSON at all, yields
//! [`NEUTRAL_SCORE`] for every item.

use serde::Deserialize;

use crate::error::{RerankError, Result};

/// Score assigned to every item of an unrecognised response.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Labels that mark the "relevant" class of a binary classifier head.
const RELEVANT_LABELS: &[&str] = &["label_1", "relevant", "1", "true", "positive"];

/// One `{label, score}` entry of a classification head.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// One `{index, score}` entry of a rerank-style response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexedScore {
    pub index: usize,
    pub score: f64,
}

/// Known response shapes, in parse-priority order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RerankResponse {
    ClassificationArrays(Vec<Vec<LabelScore>>),
    RawScores(Vec<f64>),
    IndexedScores(Vec<IndexedScore>),
    LabelScores(Vec<LabelScore>),
    WrappedScores {
        scores: Vec<f64>,
    },
    ServiceError {
        error: String,
        #[serde(default)]
        estimated_time: Option<f64>,
    },
}

impl RerankResponse {
    /// Parse a response body. `None` means the shape is not recognised.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Short shape name for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::ClassificationArrays(_) => "classification_arrays",
            Self::RawScores(_) => "raw_scores",
            Self::IndexedScores(_) => "indexed_scores",
            Self::LabelScores(_) => "label_scores",
            Self::WrappedScores { .. } => "wrapped_scores",
            Self::ServiceError { .. } => "service_error",
        }
    }

    /// Normalise into exactly `expected` scores in [0, 1].
    ///
    /// Missing positions are filled with [`NEUTRAL_SCORE`]; surplus scores are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RerankError::RemoteUnavailable`] for a service error body.
    pub fn into_scores(self, expected: usize) -> Result<Vec<f64>> {
        let scores: Vec<f64> = match self {
            Self::ClassificationArrays(items) => items.iter().map(|l| relevant_score(l)).collect(),
            Self::RawScores(logits) => logits.into_iter().map(sigmoid).collect(),
            Self::IndexedScores(entries) => {
                let mut placed = vec![NEUTRAL_SCORE; expected];
                for entry in entries {
                    if let Some(slot) = placed.get_mut(entry.index) {
                        *slot = clamp_unit(entry.score);
                    }
                }
                placed
            }
            Self::LabelScores(entries) => entries.iter().map(|e| clamp_unit(e.score)).collect(),
            Self::WrappedScores { scores } => scores.into_iter().map(clamp_unit).collect(),
            Self::ServiceError {
                error,
                estimated_time,
            } => {
                let detail = match estimated_time {
                    Some(secs) => format!("{error} (estimated {secs:.0}s)"),
                    None => error,
                };
                return Err(RerankError::RemoteUnavailable(detail));
            }
        };
        Ok(fit_length(scores, expected))
    }
}

/// Parse a body and normalise it, applying the neutral default when the
/// shape is not recognised.
///
/// # Errors
///
/// Returns [`RerankError::RemoteUnavailable`] for a service error body.
pub fn scores_from_body(body: &str, expected: usize) -> Result<Vec<f64>> {
    match RerankResponse::parse(body) {
        Some(response) => {
            let shape = response.shape();
            let scores = response.into_scores(expected)?;
            tracing::debug!(shape, count = scores.len(), "parsed remote scores");
            Ok(scores)
        }
        None => {
            tracing::warn!(
                expected,
                body_len = body.len(),
                "unrecognised remote response shape, using neutral scores"
            );
            Ok(vec![NEUTRAL_SCORE; expected])
        }
    }
}

/// Logistic function mapping a logit to (0, 1).
pub fn sigmoid(x: f64) -> f64 {
    if !x.is_finite() {
        return if x.is_nan() {
            NEUTRAL_SCORE
        } else if x > 0.0 {
            1.0
        } else {
            0.0
        };
    }
    1.0 / (1.0 + (-x).exp())
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        NEUTRAL_SCORE
    } else {
        x.clamp(0.0, 1.0)
    }
}

fn relevant_score(labels: &[LabelScore]) -> f64 {
    let relevant = labels
        .iter()
        .find(|l| RELEVANT_LABELS.contains(&l.label.to_lowercase().as_str()));
    match relevant {
        Some(l) => clamp_unit(l.score),
        None => labels
            .iter()
            .map(|l| l.score)
            .filter(|s| !s.is_nan())
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
            .map_or(NEUTRAL_SCORE, clamp_unit),
    }
}

fn fit_length(mut scores: Vec<f64>, expected: usize) -> Vec<f64> {
    if scores.len() != expected {
        tracing::warn!(
            got = scores.len(),
            expected,
            "remote score count mismatch, padding with neutral scores"
        );
        scores.resize(expected, NEUTRAL_SCORE);
    }
    scores
}
