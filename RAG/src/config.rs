use crate::error::ConfigError;
use crate::models::DEFAULT_BASE_URL;
use std::env;
use std::time::Duration;

/// Per-stage request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub health: Duration,
    pub keywords: Duration,
    pub parameters: Duration,
    /// Used for the single retry after `parameters` timed out.
    pub parameters_retry: Duration,
    pub query: Duration,
    pub history: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(30),
            keywords: Duration::from_secs(30),
            parameters: Duration::from_secs(60),
            parameters_retry: Duration::from_secs(240),
            query: Duration::from_secs(240),
            history: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: StageTimeouts,
}

impl ClientConfig {
    /// Loads `.env` if present, then reads the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StageTimeouts::default();
        let secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::Timeout { key, value }),
            }
        };

        let timeouts = StageTimeouts {
            health: secs("RAG_HEALTH_TIMEOUT_SECS", defaults.health)?,
            keywords: secs("RAG_KEYWORDS_TIMEOUT_SECS", defaults.keywords)?,
            parameters: secs("RAG_PARAMETERS_TIMEOUT_SECS", defaults.parameters)?,
            parameters_retry: secs(
                "RAG_PARAMETERS_RETRY_TIMEOUT_SECS",
                defaults.parameters_retry,
            )?,
            query: secs("RAG_QUERY_TIMEOUT_SECS", defaults.query)?,
            history: secs("RAG_HISTORY_TIMEOUT_SECS", defaults.history)?,
        };

        Ok(Self {
            base_url: lookup("RAG_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeouts,
        })
    }
}
