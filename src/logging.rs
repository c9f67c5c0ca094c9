use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `--debug` wins over `--log-level`.
pub fn resolve_level(level: &str, debug: bool) -> Result<Level> {
    if debug {
        return Ok(Level::DEBUG);
    }
    level.parse().context("Invalid log level")
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the resolved level.
pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = resolve_level(level, debug)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    installed.context("Failed to install tracing subscriber")
}
