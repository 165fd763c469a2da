use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single call against the RAG service.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out after {}s", .after.as_secs_f32())]
    Timeout { after: Duration },

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl StageError {
    /// Classifies a reqwest error raised by a call that ran with `timeout`.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            StageError::Timeout { after: timeout }
        } else if err.is_decode() {
            StageError::Decode(err)
        } else {
            StageError::Network(err)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StageError::Timeout { .. })
    }
}

/// Rejected user input, raised before any call is made.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("invalid base URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("temperature must be within 0.0..=1.0, got {0}")]
    Temperature(f32),

    #[error("k must be within 1..=20, got {0}")]
    K(u32),

    #[error("chunk overlap must be within 0..=50, got {0}")]
    ChunkOverlap(u32),

    #[error("rerank k must be within 1..=20, got {0}")]
    RerankK(u32),

    #[error("history limit must be within 1..=10, got {0}")]
    HistoryLimit(u32),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a whole number of seconds, got {value:?}")]
    Timeout { key: &'static str, value: String },
}
