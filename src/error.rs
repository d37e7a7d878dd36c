// Error types for repo-health.
// Covers GitHub API failures, cache IO, and configuration problems.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HealthError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired credentials")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("{method} {url} failed with HTTP {status}, payload: {payload}")]
    Write {
        method: String,
        url: String,
        status: u16,
        payload: String,
    },

    #[error("Missing GitHub credentials (set github_username and github_access_token)")]
    MissingCredentials,

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl HealthError {
    /// True when the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HealthError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, HealthError>;
