//! Application configuration: YAML file, then environment overrides, then CLI flags.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cdp_adapter::config::parse_headless;
use cdp_adapter::CdpConfig;
use page_capture::CaptureOptions;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

/// Settings for the host-side resource pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub concurrency: usize,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 15_000,
            concurrency: 8,
            user_agent: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub browser: CdpConfig,
    pub capture: CaptureOptions,
    pub fetch: FetchSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./captures"),
            browser: CdpConfig::default(),
            capture: CaptureOptions::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Applies `PAGEFREEZE_HEADLESS`, `PAGEFREEZE_CHROME` and `PAGEFREEZE_OUTPUT_DIR`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("PAGEFREEZE_HEADLESS") {
            self.browser.headless = parse_headless(&value);
        }
        if let Some(value) = lookup("PAGEFREEZE_CHROME").filter(|v| !v.trim().is_empty()) {
            self.browser.executable = PathBuf::from(value.trim());
        }
        if let Some(value) = lookup("PAGEFREEZE_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(value.trim());
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("pagefreeze");
    path.push("config.yaml");
    Ok(path)
}

/// Loads the config at `config_path` (or the per-user default); a missing file yields
/// defaults.
pub async fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    let mut config = if fs::try_exists(&config_path).await.unwrap_or(false) {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config = AppConfig::from_yaml(&content)?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        AppConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}
