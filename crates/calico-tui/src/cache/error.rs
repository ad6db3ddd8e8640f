use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),

    #[error("corrupt cache entry: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}
