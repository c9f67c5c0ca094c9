//! PageFreeze library
//!
//! Exposes the capture pipeline and configuration for the binary and integration tests.

pub mod config;
pub mod errors;
pub mod logging;
pub mod pipeline;

pub use config::{load_config, AppConfig, FetchSettings};
pub use errors::PipelineError;
pub use pipeline::{capture_page, capture_static, write_output, CaptureOutput, CaptureRequest};
