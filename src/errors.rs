use std::path::PathBuf;

use cdp_adapter::AdapterError;
use page_capture::CaptureError;
use pagefreeze_core_types::CoreError;
use thiserror::Error;

/// Failures of a capture run that are not recovered locally.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("browser: {0}")]
    Browser(#[from] AdapterError),

    #[error("capture: {0}")]
    Capture(#[from] CaptureError),

    #[error("failed to encode capture: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
