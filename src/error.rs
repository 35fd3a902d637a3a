//! Error types for the evidence-rerank crate.
//!
//! Messages are stable lowercase strings. API keys and query text never
//! appear in error messages.

/// Errors that can occur while scoring, chunking or ranking evidence.
///
/// Only [`RerankError::Config`] and [`RerankError::Io`] ever reach callers of
/// the public ranking entry points; every other variant is absorbed by a
/// fallback path inside the engine.
#[derive(Debug, thiserror::Error)]
pub enum RerankError {
    /// The remote model is cold, removed, or remote scoring is disabled.
    #[error("remote reranker unavailable: {0}")]
    RemoteUnavailable(String),

    /// A remote scoring call exceeded its time bound.
    #[error("remote reranker timed out: {0}")]
    RemoteTimeout(String),

    /// The remote service answered with a body that could not be read.
    #[error("remote reranker protocol error: {0}")]
    RemoteProtocol(String),

    /// Transport failure or a non-soft error status from the remote service.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The full-text collaborator failed for one document.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Chunking produced no usable passages.
    #[error("chunking error: {0}")]
    Chunking(String),

    /// Any other failure inside the two-stage flow.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error while reading configuration or input files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RerankError {
    /// Returns `true` for remote failures that are expected in normal
    /// operation (cold model, removed model, timeout).
    pub fn is_soft_remote_failure(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_) | Self::RemoteTimeout(_))
    }
}

/// Convenience type alias for evidence-rerank results.
pub type Result<T> = std::result::Result<T, RerankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_remote_unavailable() {
        let err = RerankError::RemoteUnavailable("HTTP 503".into());
        assert_eq!(err.to_string(), "remote reranker unavailable: HTTP 503");
    }

    #[test]
    fn display_remote_timeout() {
        let err = RerankError::RemoteTimeout("exceeded 10000ms".into());
        assert_eq!(err.to_string(), "remote reranker timed out: exceeded 10000ms");
    }

    #[test]
    fn display_http() {
        let err = RerankError::Http("HTTP 500: boom".into());
        assert_eq!(err.to_string(), "HTTP error: HTTP 500: boom");
    }

    #[test]
    fn display_config() {
        let err = RerankError::Config("top_k must be greater than 0".into());
        assert_eq!(err.to_string(), "config error: top_k must be greater than 0");
    }

    #[test]
    fn soft_failures_are_classified() {
        assert!(RerankError::RemoteUnavailable("x".into()).is_soft_remote_failure());
        assert!(RerankError::RemoteTimeout("x".into()).is_soft_remote_failure());
        assert!(!RerankError::Http("x".into()).is_soft_remote_failure());
        assert!(!RerankError::RemoteProtocol("x".into()).is_soft_remote_failure());
        assert!(!RerankError::Pipeline("x".into()).is_soft_remote_failure());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err: RerankError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RerankError>();
    }
}
