//! Full-text enrichment of stage-1 survivors.
//!
//! An external [`FullTextSource`] may turn an abstract-only candidate into
//! one with named sections or pre-structured passages. Every request runs
//! concurrently under its own timeout, and every outcome is collected: a
//! failed or slow document simply keeps its original content.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::config::EnrichmentConfig;
use crate::error::{RerankError, Result};
use crate::types::{Candidate, EnrichedContent};

/// Collaborator that fetches full text for one document.
#[async_trait]
pub trait FullTextSource: Send + Sync {
    /// Fetch full text for `candidate` (identified by its source and id),
    /// given the original query.
    async fn enrich(&self, candidate: &Candidate, query: &str) -> Result<EnrichedContent>;
}

/// A source that never adds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

#[async_trait]
impl FullTextSource for NoEnrichment {
    async fn enrich(&self, _candidate: &Candidate, _query: &str) -> Result<EnrichedContent> {
        Ok(EnrichedContent::default())
    }
}

/// Counts from one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Requests sent to the collaborator.
    pub attempted: usize,
    /// Requests that returned new content.
    pub enriched: usize,
    /// Requests that failed or timed out.
    pub failed: usize,
    /// Candidates that already carried full content.
    pub skipped: usize,
}

/// Runs a [`FullTextSource`] over a set of candidates.
#[derive(Clone)]
pub struct EnrichmentCoordinator {
    source: Arc<dyn FullTextSource>,
    enabled: bool,
    timeout: Duration,
}

impl std::fmt::Debug for EnrichmentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentCoordinator")
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl EnrichmentCoordinator {
    pub fn new(source: Arc<dyn FullTextSource>, config: &EnrichmentConfig) -> Self {
        Self {
            source,
            enabled: config.enabled,
            timeout: config.timeout(),
        }
    }

    /// A coordinator that passes candidates through untouched.
    pub fn disabled() -> Self {
        Self {
            source: Arc::new(NoEnrichment),
            enabled: false,
            timeout: Duration::ZERO,
        }
    }

    /// Enrich every candidate concurrently, preserving order.
    ///
    /// Never fails. Candidates whose enrichment fails, times out or returns
    /// nothing are returned unchanged.
    pub async fn enrich_all(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
    ) -> (Vec<Candidate>, EnrichmentReport) {
        let mut report = EnrichmentReport::default();
        if !self.enabled || candidates.is_empty() {
            return (candidates, report);
        }

        let futures = candidates.iter().map(|candidate| async move {
            if candidate.has_full_content() {
                return Outcome::Skipped;
            }
            match self.enrich_one(candidate, query).await {
                Ok(content) => Outcome::Fetched(content),
                Err(e) => {
                    tracing::warn!(
                        source = %candidate.source,
                        id = %candidate.id,
                        error = %e,
                        "enrichment failed, keeping original content"
                    );
                    Outcome::Failed
                }
            }
        });
        let outcomes = join_all(futures).await;

        let merged = candidates
            .into_iter()
            .zip(outcomes)
            .map(|(candidate, outcome)| match outcome {
                Outcome::Skipped => {
                    report.skipped += 1;
                    candidate
                }
                Outcome::Failed => {
                    report.attempted += 1;
                    report.failed += 1;
                    candidate
                }
                Outcome::Fetched(content) => {
                    report.attempted += 1;
                    if content.full_text_sections.is_none() && content.content_chunks.is_none() {
                        candidate
                    } else {
                        report.enriched += 1;
                        candidate.with_enrichment(content)
                    }
                }
            })
            .collect();

        tracing::debug!(
            attempted = report.attempted,
            enriched = report.enriched,
            failed = report.failed,
            skipped = report.skipped,
            "enrichment complete"
        );
        (merged, report)
    }

    async fn enrich_one(&self, candidate: &Candidate, query: &str) -> Result<EnrichedContent> {
        match tokio::time::timeout(self.timeout, self.source.enrich(candidate, query)).await {
            Ok(result) => result,
            Err(_) => Err(RerankError::Enrichment(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

enum Outcome {
    Skipped,
    Failed,
    Fetched(EnrichedContent),
}
