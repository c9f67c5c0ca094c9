use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("canvas read-back refused: {0}")]
    CanvasTainted(String),
    #[error("video frame unavailable: {0}")]
    FrameUnavailable(String),
    #[error("stylesheet rules unavailable: {0}")]
    StylesheetAccess(String),
    #[error("invalid live page snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("dom error: {0}")]
    Dom(#[from] page_dom::DomError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CaptureError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
