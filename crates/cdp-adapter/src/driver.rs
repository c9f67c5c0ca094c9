use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::AdapterError;

/// When navigation is considered finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WaitPolicy {
    Load,
    DomContentLoaded,
    #[default]
    NetworkIdle,
}

impl WaitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitPolicy::Load => "load",
            WaitPolicy::DomContentLoaded => "domcontentloaded",
            WaitPolicy::NetworkIdle => "networkidle",
        }
    }
}

impl FromStr for WaitPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_ascii_lowercase();
        // networkidle0, networkidle2 ... all mean the same thing here
        if lower.starts_with("networkidle") {
            return Ok(WaitPolicy::NetworkIdle);
        }
        match lower.as_str() {
            "load" => Ok(WaitPolicy::Load),
            "domcontentloaded" => Ok(WaitPolicy::DomContentLoaded),
            other => Err(format!("unknown wait policy: {other}")),
        }
    }
}

impl TryFrom<String> for WaitPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WaitPolicy> for String {
    fn from(value: WaitPolicy) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WaitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    pub timeout: Option<Duration>,
    pub wait_policy: WaitPolicy,
}

/// Host-side callback reachable from page scripts. Receives the call arguments and returns a
/// JSON value (or an error message rejected into the page).
pub type HostFunction = Arc<dyn Fn(Vec<Value>) -> Result<Value, String> + Send + Sync>;

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str, options: NavigateOptions) -> Result<(), AdapterError>;

    /// Calls `function` (a JavaScript function expression) with `args` and returns the
    /// structurally cloned result.
    async fn evaluate_in_page(&self, function: &str, args: Value) -> Result<Value, AdapterError>;

    async fn expose_host_function(
        &self,
        name: &str,
        function: HostFunction,
    ) -> Result<(), AdapterError>;

    async fn close(&self) -> Result<(), AdapterError>;
}

/// Navigates, retrying with [`WaitPolicy::Load`] when waiting for network idle times out.
pub async fn navigate_with_fallback<D>(
    driver: &D,
    url: &str,
    options: NavigateOptions,
) -> Result<(), AdapterError>
where
    D: BrowserDriver + ?Sized,
{
    match driver.navigate(url, options).await {
        Err(err) if err.is_timeout() && options.wait_policy == WaitPolicy::NetworkIdle => {
            warn!(%url, %err, "network idle not reached, falling back to load");
            driver
                .navigate(
                    url,
                    NavigateOptions {
                        wait_policy: WaitPolicy::Load,
                        ..options
                    },
                )
                .await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_networkidle_spelling_is_network_idle() {
        for value in ["networkidle", "networkidle0", "networkidle2", "NetworkIdle"] {
            assert_eq!(value.parse::<WaitPolicy>(), Ok(WaitPolicy::NetworkIdle));
        }
        assert_eq!("load".parse::<WaitPolicy>(), Ok(WaitPolicy::Load));
        assert_eq!(
            "domcontentloaded".parse::<WaitPolicy>(),
            Ok(WaitPolicy::DomContentLoaded)
        );
        assert!("commit".parse::<WaitPolicy>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let value = serde_json::to_value(WaitPolicy::DomContentLoaded).unwrap();
        assert_eq!(value, Value::String("domcontentloaded".into()));
        let parsed: WaitPolicy = serde_json::from_value(Value::String("networkidle2".into())).unwrap();
        assert_eq!(parsed, WaitPolicy::NetworkIdle);
    }
}
