//! Typed errors for the ingestion and extraction core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Provider unreachable, timed out, or answered with a non-success status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider returned HTTP {status} for {url}")]
    ProviderStatus { status: u16, url: String },

    /// Store unavailable or a write failed; the batch has been rolled back.
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid skill vocabulary: {0}")]
    Vocabulary(#[from] regex::Error),

    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("no source provider configured for ingestion")]
    NoProvider,

    #[error("malformed provider payload: {0}")]
    Provider(#[from] serde_json::Error),
}

impl Error {
    /// Transient failures worth another provider attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::ProviderStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
