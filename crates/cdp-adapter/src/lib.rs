//! Browser driver for PageFreeze.
//!
//! The capture pipeline only talks to a [`BrowserDriver`]: navigate, evaluate a function in the
//! page, expose a host hook, close. [`ChromiumDriver`] implements it over the DevTools protocol
//! with chromiumoxide.

pub mod chromium;
pub mod driver;

pub use chromium::ChromiumDriver;
pub use config::{BrowserCookie, CdpConfig, Viewport};
pub use driver::{
    navigate_with_fallback, BrowserDriver, HostFunction, NavigateOptions, WaitPolicy,
};
pub use error::{AdapterError, AdapterErrorKind};

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the driver.
    #[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("navigation failed")]
        NavFailed,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("browser launch failed")]
        LaunchFailed,
        #[error("page evaluation failed")]
        EvaluationFailed,
        #[error("browser closed")]
        Closed,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to the pipeline.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
        pub data: Option<serde_json::Value>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
                data: None,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn with_data(mut self, data: serde_json::Value) -> Self {
            self.data = Some(data);
            self
        }

        pub fn is_timeout(&self) -> bool {
            self.kind == AdapterErrorKind::NavTimeout
        }
    }
}

pub mod config {
    use crate::driver::WaitPolicy;
    use serde::{Deserialize, Serialize};
    use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};
    use which::which;

    pub const CHROME_ENV: &str = "PAGEFREEZE_CHROME";

    /// Binary names looked up on `PATH`, most preferred first.
    #[cfg(windows)]
    const BROWSER_BINARIES: &[&str] = &["chrome.exe", "msedge.exe", "chromium.exe"];
    #[cfg(not(windows))]
    const BROWSER_BINARIES: &[&str] = &[
        "google-chrome-stable",
        "google-chrome",
        "chromium",
        "chromium-browser",
    ];

    #[cfg(windows)]
    const INSTALL_LOCATIONS: &[&str] = &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    ];
    #[cfg(target_os = "macos")]
    const INSTALL_LOCATIONS: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    #[cfg(not(any(windows, target_os = "macos")))]
    const INSTALL_LOCATIONS: &[&str] = &[
        "/opt/google/chrome/chrome",
        "/usr/bin/chromium",
        "/snap/bin/chromium",
    ];

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Viewport {
        pub width: u32,
        pub height: u32,
    }

    /// Cookie installed in the browser context before navigation.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct BrowserCookie {
        pub name: String,
        pub value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub domain: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub secure: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub http_only: Option<bool>,
    }

    /// Configuration for launching the browser and loading the page.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub user_data_dir: Option<PathBuf>,
        pub headless: bool,
        /// Headful browser and a pause before navigation so devtools can attach.
        pub debug: bool,
        pub args: Vec<String>,
        pub viewport: Option<Viewport>,
        pub user_agent: Option<String>,
        pub extra_headers: BTreeMap<String, String>,
        pub cookies: Vec<BrowserCookie>,
        pub bypass_csp: bool,
        /// Upper bound for navigation; 0 waits forever.
        pub load_max_time_ms: u64,
        pub wait_until: WaitPolicy,
        /// Extra wait after the page is considered loaded.
        pub wait_delay_ms: u64,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: Self::locate_executable(|key| env::var(key).ok()),
                user_data_dir: None,
                headless: resolve_headless_default(),
                debug: false,
                args: Vec::new(),
                viewport: None,
                user_agent: None,
                extra_headers: BTreeMap::new(),
                cookies: Vec::new(),
                bypass_csp: true,
                load_max_time_ms: 60_000,
                wait_until: WaitPolicy::default(),
                wait_delay_ms: 0,
            }
        }
    }

    impl CdpConfig {
        pub fn load_timeout(&self) -> Option<Duration> {
            (self.load_max_time_ms > 0).then(|| Duration::from_millis(self.load_max_time_ms))
        }

        pub fn effective_headless(&self) -> bool {
            self.headless && !self.debug
        }

        /// First usable browser: an existing `PAGEFREEZE_CHROME` path, a `PATH` hit, then a
        /// platform install location. Empty when none is found.
        pub fn locate_executable<F>(lookup: F) -> PathBuf
        where
            F: Fn(&str) -> Option<String>,
        {
            lookup(CHROME_ENV)
                .map(|raw| PathBuf::from(raw.trim()))
                .filter(|path| !path.as_os_str().is_empty() && path.exists())
                .or_else(|| BROWSER_BINARIES.iter().find_map(|name| which(name).ok()))
                .or_else(|| {
                    INSTALL_LOCATIONS
                        .iter()
                        .map(PathBuf::from)
                        .find(|path| path.exists())
                })
                .unwrap_or_default()
        }
    }

    pub(crate) fn resolve_headless_default() -> bool {
        // "0", "false", "no", "off" means headful
        match env::var("PAGEFREEZE_HEADLESS") {
            Ok(value) => parse_headless(&value),
            Err(_) => true,
        }
    }

    pub fn parse_headless(value: &str) -> bool {
        let lower = value.trim().to_ascii_lowercase();
        !matches!(lower.as_str(), "0" | "false" | "no" | "off")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn headless_switch_values() {
            assert!(parse_headless("1"));
            assert!(parse_headless("yes"));
            assert!(!parse_headless("OFF"));
            assert!(!parse_headless(" false "));
        }

        #[test]
        fn debug_forces_headful() {
            let config = CdpConfig {
                headless: true,
                debug: true,
                ..CdpConfig::default()
            };
            assert!(!config.effective_headless());
        }

        #[test]
        fn zero_load_time_disables_timeout() {
            let config = CdpConfig {
                load_max_time_ms: 0,
                ..CdpConfig::default()
            };
            assert_eq!(config.load_timeout(), None);
        }

        #[test]
        fn chrome_override_must_exist() {
            let dir = tempfile::tempdir().unwrap();
            let binary = dir.path().join("chrome");
            std::fs::write(&binary, b"").unwrap();
            let found = CdpConfig::locate_executable(|key| {
                (key == CHROME_ENV).then(|| format!(" {} ", binary.display()))
            });
            assert_eq!(found, binary);

            let missing = dir.path().join("absent");
            let found = CdpConfig::locate_executable(|_| Some(missing.display().to_string()));
            assert_ne!(found, missing);
        }

        #[test]
        fn deserializes_with_defaults() {
            let config: CdpConfig = serde_json::from_value(serde_json::json!({
                "wait_until": "networkidle2",
                "viewport": { "width": 1280, "height": 720 },
                "cookies": [{ "name": "sid", "value": "abc", "httpOnly": true }]
            }))
            .unwrap();
            assert!(config.bypass_csp);
            assert_eq!(config.wait_until, WaitPolicy::NetworkIdle);
            assert_eq!(config.viewport.map(|v| v.width), Some(1280));
            assert_eq!(config.cookies[0].http_only, Some(true));
        }
    }
}
