use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid resource url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme {scheme} for {url}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("timed out fetching {0}")]
    Timeout(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}
