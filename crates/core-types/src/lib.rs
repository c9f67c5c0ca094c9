use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Error shared by crates that only need to carry a message across a boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{message}")]
    Message { message: String },
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
}

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CaptureId(pub String);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PageId(pub String);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one capture of one page, for logs and output records.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureRoute {
    pub capture: CaptureId,
    pub page: PageId,
    pub url: String,
    #[cfg(feature = "serde-full")]
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl CaptureRoute {
    pub fn new(page: PageId, url: impl Into<String>) -> Self {
        Self {
            capture: CaptureId::new(),
            page,
            url: url.into(),
            #[cfg(feature = "serde-full")]
            started_at: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for CaptureRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capture={} page={} url={}",
            self.capture.0, self.page.0, self.url
        )
    }
}
