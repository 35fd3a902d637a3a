//! Batched HTTP client for an external cross-encoder scoring service.
//!
//! # Request
//!
//! Each batch is one `POST` to the configured endpoint:
//!
//! ```json
//! {"inputs": [{"text": "<query>", "text_pair": "<document>"}, ...]}
//! ```
//!
//! with `Authorization: Bearer <key>` when an API key is configured.
//!
//! # Failure model
//!
//! - timeout, refused connection, HTTP 404/410/503, or a service error body
//!   → soft ([`RerankError::RemoteUnavailable`] / [`RerankError::RemoteTimeout`])
//! - any other non-success status or transport error → hard ([`RerankError::Http`])
//! - unrecognised success body → neutral scores, not an error
//!
//! All batches of one call run concurrently and fail independently:
//! [`RemoteReranker::score_each`] reports the items of a failed batch as
//! unscored and keeps every sibling batch's scores.

pub mod response;

use futures::future::join_all;
use reqwest::StatusCode;
use serde::Serialize;

use crate::cache::{ScoreCache, ScoreKey};
use crate::config::RemoteConfig;
use crate::error::{RerankError, Result};
use crate::http::{build_client, classify_reqwest_error};
use crate::text::truncate_chars;

/// Status codes meaning the model is cold, removed or temporarily offline.
pub const UNAVAILABLE_STATUSES: &[StatusCode] = &[
    StatusCode::NOT_FOUND,
    StatusCode::GONE,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Maximum characters of an error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct PairInput<'a> {
    text: &'a str,
    text_pair: &'a str,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    inputs: Vec<PairInput<'a>>,
}

/// One remote batch that failed, with the input positions it covered.
#[derive(Debug)]
pub struct BatchFailure {
    pub items: Vec<usize>,
    pub error: RerankError,
}

/// Per-item outcome of [`RemoteReranker::score_each`].
#[derive(Debug, Default)]
pub struct RemoteScores {
    /// One entry per input text; `None` where the item's batch failed.
    pub scores: Vec<Option<f64>>,
    pub failures: Vec<BatchFailure>,
}

impl RemoteScores {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.scores.iter().all(Option::is_some)
    }

    pub fn scored_count(&self) -> usize {
        self.scores.iter().filter(|s| s.is_some()).count()
    }

    /// All scores, or the first batch error if any item is unscored.
    ///
    /// # Errors
    ///
    /// Returns the first failed batch's error, or a protocol error if an
    /// item is unscored without a recorded failure.
    pub fn into_complete(self) -> Result<Vec<f64>> {
        if let Some(failure) = self.failures.into_iter().next() {
            return Err(failure.error);
        }
        self.scores
            .into_iter()
            .map(|s| {
                s.ok_or_else(|| RerankError::RemoteProtocol("missing score after batching".into()))
            })
            .collect()
    }
}

/// Client for the remote cross-encoder.
#[derive(Debug, Clone)]
pub struct RemoteReranker {
    config: RemoteConfig,
    client: reqwest::Client,
    cache: ScoreCache,
}

impl RemoteReranker {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RerankError::Http`] if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = build_client(&config)?;
        let cache = ScoreCache::new(config.cache_ttl_seconds, config.cache_capacity);
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Score every text against `query`, preserving input order.
    ///
    /// # Errors
    ///
    /// Fails when scoring is disabled or when any batch fails. Use
    /// [`RemoteReranker::score_each`] to keep the batches that succeeded.
    pub async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f64>> {
        self.score_each(query, texts).await?.into_complete()
    }

    /// Score every text against `query`, one outcome per item.
    ///
    /// Items whose batch failed are `None` in [`RemoteScores::scores`]; the
    /// batch errors are collected in [`RemoteScores::failures`].
    ///
    /// # Errors
    ///
    /// Returns a soft error only when remote scoring is disabled.
    pub async fn score_each(&self, query: &str, texts: &[String]) -> Result<RemoteScores> {
        if !self.config.enabled {
            return Err(RerankError::RemoteUnavailable(
                "remote scoring disabled".into(),
            ));
        }
        if texts.is_empty() {
            return Ok(RemoteScores::default());
        }

        let query = truncate_chars(query, self.config.max_query_chars);
        let documents: Vec<&str> = texts
            .iter()
            .map(|t| truncate_chars(t, self.config.max_document_chars))
            .collect();
        let keys: Vec<ScoreKey> = documents
            .iter()
            .map(|d| ScoreKey::new(&self.config.model, query, d))
            .collect();

        let mut scores: Vec<Option<f64>> = Vec::with_capacity(documents.len());
        for key in &keys {
            scores.push(self.cache.get(key).await);
        }
        let misses: Vec<usize> = (0..documents.len())
            .filter(|&i| scores[i].is_none())
            .collect();

        tracing::debug!(
            model = %self.config.model,
            total = documents.len(),
            cached = documents.len() - misses.len(),
            batch_size = self.config.batch_size,
            "remote scoring request"
        );

        let mut failures = Vec::new();
        if !misses.is_empty() {
            let batches: Vec<&[usize]> = misses.chunks(self.config.batch_size.max(1)).collect();
            let futures = batches.iter().map(|batch| {
                let docs: Vec<&str> = batch.iter().map(|&i| documents[i]).collect();
                async move { self.post_batch(query, &docs).await }
            });
            let outcomes = join_all(futures).await;

            for (batch, outcome) in batches.iter().zip(outcomes) {
                match outcome {
                    Ok(batch_scores) => {
                        for (&i, score) in batch.iter().zip(batch_scores) {
                            scores[i] = Some(score);
                            self.cache.insert(keys[i], score).await;
                        }
                    }
                    Err(e) => failures.push(BatchFailure {
                        items: batch.to_vec(),
                        error: e,
                    }),
                }
            }
        }

        Ok(RemoteScores { scores, failures })
    }

    /// Send one batch and normalise the response.
    async fn post_batch(&self, query: &str, documents: &[&str]) -> Result<Vec<f64>> {
        let request = ScoreRequest {
            inputs: documents
                .iter()
                .map(|d| PairInput {
                    text: query,
                    text_pair: d,
                })
                .collect(),
        };

        let mut builder = self.client.post(&self.config.endpoint_url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let start = std::time::Instant::now();
        let resp = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let status = resp.status();

        if UNAVAILABLE_STATUSES.contains(&status) {
            return Err(RerankError::RemoteUnavailable(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let body = resp.text().await.map_err(|e| {
            let classified = classify_reqwest_error(&e);
            if classified.is_soft_remote_failure() {
                classified
            } else {
                RerankError::RemoteProtocol(format!("failed to read response body: {e}"))
            }
        })?;

        if !status.is_success() {
            let detail: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(RerankError::Http(format!(
                "HTTP {}: {detail}",
                status.as_u16()
            )));
        }

        tracing::trace!(
            batch = documents.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "remote batch scored"
        );
        response::scores_from_body(&body, documents.len())
    }
}
