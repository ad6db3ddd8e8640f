use std::time::Duration;

use thiserror::Error;

/// Failure of one HTTP round trip to the metadata or rating service.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
