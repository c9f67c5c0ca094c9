//! Navigation fallback behaviour against a scripted driver.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{
    navigate_with_fallback, AdapterError, AdapterErrorKind, BrowserDriver, HostFunction,
    NavigateOptions, WaitPolicy,
};
use serde_json::Value;

/// Fails every navigation whose policy is listed in `failing` with the given kind.
struct ScriptedDriver {
    failing: Vec<(WaitPolicy, AdapterErrorKind)>,
    calls: Mutex<Vec<WaitPolicy>>,
}

impl ScriptedDriver {
    fn new(failing: Vec<(WaitPolicy, AdapterErrorKind)>) -> Self {
        Self {
            failing,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<WaitPolicy> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&self, _url: &str, options: NavigateOptions) -> Result<(), AdapterError> {
        self.calls.lock().unwrap().push(options.wait_policy);
        match self
            .failing
            .iter()
            .find(|(policy, _)| *policy == options.wait_policy)
        {
            Some((_, kind)) => Err(AdapterError::new(kind.clone())),
            None => Ok(()),
        }
    }

    async fn evaluate_in_page(&self, _function: &str, args: Value) -> Result<Value, AdapterError> {
        Ok(args)
    }

    async fn expose_host_function(
        &self,
        _name: &str,
        _function: HostFunction,
    ) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

fn options(policy: WaitPolicy) -> NavigateOptions {
    NavigateOptions {
        timeout: Some(Duration::from_secs(5)),
        wait_policy: policy,
    }
}

#[tokio::test]
async fn network_idle_timeout_falls_back_to_load() {
    let driver = ScriptedDriver::new(vec![(WaitPolicy::NetworkIdle, AdapterErrorKind::NavTimeout)]);
    navigate_with_fallback(&driver, "https://example.com", options(WaitPolicy::NetworkIdle))
        .await
        .expect("load fallback succeeds");
    assert_eq!(driver.calls(), vec![WaitPolicy::NetworkIdle, WaitPolicy::Load]);
}

#[tokio::test]
async fn other_navigation_failures_propagate() {
    let driver = ScriptedDriver::new(vec![(WaitPolicy::NetworkIdle, AdapterErrorKind::NavFailed)]);
    let err = navigate_with_fallback(&driver, "https://example.com", options(WaitPolicy::NetworkIdle))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AdapterErrorKind::NavFailed);
    assert_eq!(driver.calls(), vec![WaitPolicy::NetworkIdle]);
}

#[tokio::test]
async fn load_timeout_is_not_retried() {
    let driver = ScriptedDriver::new(vec![(WaitPolicy::Load, AdapterErrorKind::NavTimeout)]);
    let err = navigate_with_fallback(&driver, "https://example.com", options(WaitPolicy::Load))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(driver.calls(), vec![WaitPolicy::Load]);
}

#[tokio::test]
async fn fallback_timeout_surfaces() {
    let driver = ScriptedDriver::new(vec![
        (WaitPolicy::NetworkIdle, AdapterErrorKind::NavTimeout),
        (WaitPolicy::Load, AdapterErrorKind::NavTimeout),
    ]);
    let err = navigate_with_fallback(&driver, "https://example.com", options(WaitPolicy::NetworkIdle))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(driver.calls().len(), 2);
}

#[tokio::test]
async fn driver_is_object_safe() {
    let driver: Arc<dyn BrowserDriver> = Arc::new(ScriptedDriver::new(Vec::new()));
    navigate_with_fallback(driver.as_ref(), "about:blank", NavigateOptions::default())
        .await
        .unwrap();
}
