//! Reranking configuration with sensible defaults.
//!
//! [`RerankConfig`] is the whole configuration surface: remote scoring,
//! stage sizes, fusion weights, chunking, priority source and enrichment.
//! Every section deserialises with `#[serde(default)]`, so a TOML file only
//! needs the keys it wants to change.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{RerankError, Result};

/// Default HuggingFace inference endpoint for the cross-encoder.
pub const DEFAULT_ENDPOINT_URL: &str =
    "https://api-inference.huggingface.co/models/BAAI/bge-reranker-v2-m3";

/// Default cross-encoder model identifier.
pub const DEFAULT_MODEL: &str = "BAAI/bge-reranker-v2-m3";

/// Top-level configuration for a [`RerankEngine`](crate::RerankEngine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Year used as "now" by recency decay. `None` reads the system clock.
    pub reference_year: Option<i32>,
    /// Remote cross-encoder settings.
    pub remote: RemoteConfig,
    /// Stage-1 (document triage) settings.
    pub document_stage: DocumentStageConfig,
    /// Stage-2 (chunk re-scoring) settings.
    pub chunk_stage: ChunkStageConfig,
    /// Sliding-window chunking settings.
    pub chunking: ChunkingConfig,
    /// Priority-source settings.
    pub priority: PriorityConfig,
    /// Full-text enrichment settings.
    pub enrichment: EnrichmentConfig,
}

/// Remote cross-encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Whether the remote scorer is attempted at all.
    pub enabled: bool,
    /// Inference endpoint receiving batched `{text, text_pair}` pairs.
    pub endpoint_url: String,
    /// Model identifier, used for logging and cache keys.
    pub model: String,
    /// Bearer token. Never logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Number of pairs per request.
    pub batch_size: usize,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Query is truncated to this many characters before sending.
    pub max_query_chars: usize,
    /// Each document is truncated to this many characters before sending.
    pub max_document_chars: usize,
    /// How long remote scores are cached. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached scores.
    pub cache_capacity: u64,
    /// Custom User-Agent. `None` uses the crate name and version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint_url: DEFAULT_ENDPOINT_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: None,
            batch_size: 32,
            timeout_ms: 10_000,
            max_query_chars: 512,
            max_document_chars: 2_000,
            cache_ttl_seconds: 600,
            cache_capacity: 10_000,
            user_agent: None,
        }
    }
}

impl RemoteConfig {
    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Stage-1 configuration.
///
/// `combined = semantic_weight * semantic + quality_weight * quality (+ priority boost)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStageConfig {
    /// Number of documents kept after stage 1 (K).
    pub top_k: usize,
    pub semantic_weight: f64,
    pub quality_weight: f64,
    /// Body characters appended to the title when building composite text.
    pub max_body_chars: usize,
}

impl Default for DocumentStageConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            semantic_weight: 0.70,
            quality_weight: 0.25,
            max_body_chars: 2_000,
        }
    }
}

/// Stage-2 configuration. The three weights must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkStageConfig {
    /// Number of passages returned (N).
    pub top_n: usize,
    pub chunk_weight: f64,
    pub document_weight: f64,
    pub quality_weight: f64,
}

impl Default for ChunkStageConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            chunk_weight: 0.45,
            document_weight: 0.35,
            quality_weight: 0.20,
        }
    }
}

/// Sliding-window chunking configuration, in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Priority-source configuration.
///
/// The priority source receives `boost` once, in the stage-1 combine, and
/// is guaranteed up to `cap` slots in the stage-1 selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Source tag treated as priority. `None` disables both effects.
    pub source: Option<String>,
    /// Flat additive stage-1 bonus.
    pub boost: f64,
    /// Maximum number of guaranteed stage-1 slots.
    pub cap: usize,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            source: Some("indian_guidelines".to_owned()),
            boost: 0.15,
            cap: 15,
        }
    }
}

/// Full-text enrichment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    /// Per-document enrichment timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 15_000,
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn check_weight(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(RerankError::Config(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

impl RerankConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `top_k`, `top_n`, `batch_size`, `timeout_ms` and `chunk_size` must be > 0
    /// - `chunk_overlap * 2` must be < `chunk_size`
    /// - every weight must be finite and within [0, 1]
    /// - chunk-stage weights must sum to 1.0
    /// - an enabled remote scorer needs a non-empty endpoint URL
    pub fn validate(&self) -> Result<()> {
        if self.document_stage.top_k == 0 {
            return Err(RerankError::Config("top_k must be greater than 0".into()));
        }
        if self.chunk_stage.top_n == 0 {
            return Err(RerankError::Config("top_n must be greater than 0".into()));
        }
        if self.remote.batch_size == 0 {
            return Err(RerankError::Config(
                "batch_size must be greater than 0".into(),
            ));
        }
        if self.remote.timeout_ms == 0 {
            return Err(RerankError::Config(
                "timeout_ms must be greater than 0".into(),
            ));
        }
        if self.remote.enabled && self.remote.endpoint_url.trim().is_empty() {
            return Err(RerankError::Config(
                "endpoint_url must be set when remote scoring is enabled".into(),
            ));
        }
        if self.chunking.chunk_size == 0 {
            return Err(RerankError::Config(
                "chunk_size must be greater than 0".into(),
            ));
        }
        if self.chunking.chunk_overlap.saturating_mul(2) >= self.chunking.chunk_size {
            return Err(RerankError::Config(
                "chunk_overlap must be less than half of chunk_size".into(),
            ));
        }
        if self.enrichment.enabled && self.enrichment.timeout_ms == 0 {
            return Err(RerankError::Config(
                "enrichment timeout_ms must be greater than 0".into(),
            ));
        }

        check_weight("semantic_weight", self.document_stage.semantic_weight)?;
        check_weight("document quality_weight", self.document_stage.quality_weight)?;
        check_weight("priority boost", self.priority.boost)?;
        check_weight("chunk_weight", self.chunk_stage.chunk_weight)?;
        check_weight("document_weight", self.chunk_stage.document_weight)?;
        check_weight("chunk quality_weight", self.chunk_stage.quality_weight)?;

        let chunk_sum = self.chunk_stage.chunk_weight
            + self.chunk_stage.document_weight
            + self.chunk_stage.quality_weight;
        if (chunk_sum - 1.0).abs() > 1e-6 {
            return Err(RerankError::Config(format!(
                "chunk stage weights must sum to 1.0, got {chunk_sum}"
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RerankError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RerankError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    ///
    /// See [`apply_overrides_from`](Self::apply_overrides_from) for the
    /// recognised variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `RERANK_REMOTE_ENABLED`, `HUGGINGFACE_API_KEY`,
    /// `BGE_MODEL_NAME`, `RERANK_ENDPOINT_URL`, `BGE_BATCH_SIZE_CPU`,
    /// `BGE_MAX_SEQUENCE_LENGTH` (query character cap), `RERANK_TIMEOUT_MS`,
    /// `STAGE1_TOP_DOCUMENTS`, `STAGE2_TOP_CHUNKS`, `CHUNK_SIZE`,
    /// `CHUNK_OVERLAP`, `RERANK_PRIORITY_SOURCE`.
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override::<bool, _>(&lookup, "RERANK_REMOTE_ENABLED") {
            self.remote.enabled = v;
        }
        if let Some(key) = lookup("HUGGINGFACE_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.remote.api_key = Some(key.trim().to_owned());
        }
        if let Some(model) = lookup("BGE_MODEL_NAME").filter(|m| !m.trim().is_empty()) {
            self.remote.model = model.trim().to_owned();
        }
        if let Some(url) = lookup("RERANK_ENDPOINT_URL").filter(|u| !u.trim().is_empty()) {
            self.remote.endpoint_url = url.trim().to_owned();
        }
        if let Some(v) = parse_override(&lookup, "BGE_BATCH_SIZE_CPU") {
            self.remote.batch_size = v;
        }
        if let Some(v) = parse_override(&lookup, "BGE_MAX_SEQUENCE_LENGTH") {
            self.remote.max_query_chars = v;
        }
        if let Some(v) = parse_override(&lookup, "RERANK_TIMEOUT_MS") {
            self.remote.timeout_ms = v;
        }
        if let Some(v) = parse_override(&lookup, "STAGE1_TOP_DOCUMENTS") {
            self.document_stage.top_k = v;
        }
        if let Some(v) = parse_override(&lookup, "STAGE2_TOP_CHUNKS") {
            self.chunk_stage.top_n = v;
        }
        if let Some(v) = parse_override(&lookup, "CHUNK_SIZE") {
            self.chunking.chunk_size = v;
        }
        if let Some(v) = parse_override(&lookup, "CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = v;
        }
        if let Some(source) = lookup("RERANK_PRIORITY_SOURCE") {
            let source = source.trim();
            self.priority.source = if source.is_empty() || source.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(source.to_owned())
            };
        }
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, "ignoring unparseable config override");
            None
        }
    }
}
