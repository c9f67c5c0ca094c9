//! Contract tests for [`ChromiumDriver`] against a real Chromium binary. Ignored by default.
//!
//! Run with:
//! ```bash
//! export PAGEFREEZE_USE_REAL_CHROME=1
//! export PAGEFREEZE_CHROME=/usr/bin/google-chrome  # or path to chrome
//! cargo test -p cdp-adapter --test chromium_contract -- --ignored --nocapture
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::{
    navigate_with_fallback, BrowserDriver, CdpConfig, ChromiumDriver, NavigateOptions, WaitPolicy,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn should_run_real_tests() -> bool {
    env::var("PAGEFREEZE_USE_REAL_CHROME")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn test_config() -> (CdpConfig, TempDir) {
    let profile = tempfile::tempdir().expect("create temporary chrome profile");
    let config = CdpConfig {
        headless: true,
        user_data_dir: Some(profile.path().into()),
        ..CdpConfig::default()
    };
    (config, profile)
}

const PAGE: &str = "data:text/html,<title>t</title><p id=x>hello</p><input id=i value=typed>";

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set PAGEFREEZE_USE_REAL_CHROME=1"]
async fn navigates_and_evaluates_with_arguments() {
    if !should_run_real_tests() {
        eprintln!("skipping chromium contract test (PAGEFREEZE_USE_REAL_CHROME not set)");
        return;
    }
    let (config, _profile) = test_config();
    let driver = ChromiumDriver::launch(config).await.expect("launch chromium");
    navigate_with_fallback(
        &driver,
        PAGE,
        NavigateOptions {
            timeout: Some(Duration::from_secs(15)),
            wait_policy: WaitPolicy::NetworkIdle,
        },
    )
    .await
    .expect("navigate");

    let value = driver
        .evaluate_in_page(
            "(options) => ({ text: document.getElementById(options.id).textContent, n: options.n + 1 })",
            json!({ "id": "x", "n": 41 }),
        )
        .await
        .expect("evaluate");
    assert_eq!(value, json!({ "text": "hello", "n": 42 }));
    driver.close().await.expect("close");
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set PAGEFREEZE_USE_REAL_CHROME=1"]
async fn exposed_host_function_answers_page_calls() {
    if !should_run_real_tests() {
        eprintln!("skipping chromium contract test (PAGEFREEZE_USE_REAL_CHROME not set)");
        return;
    }
    let (config, _profile) = test_config();
    let driver = ChromiumDriver::launch(config).await.expect("launch chromium");
    driver
        .expose_host_function(
            "hostDouble",
            Arc::new(|args: Vec<Value>| -> Result<Value, String> {
                let n = args.first().and_then(Value::as_i64).ok_or("expected a number")?;
                Ok(json!(n * 2))
            }),
        )
        .await
        .expect("expose");
    driver
        .navigate(
            PAGE,
            NavigateOptions {
                timeout: Some(Duration::from_secs(15)),
                wait_policy: WaitPolicy::Load,
            },
        )
        .await
        .expect("navigate");

    let value = driver
        .evaluate_in_page("(n) => globalThis.hostDouble(n)", json!(21))
        .await
        .expect("evaluate");
    assert_eq!(value, json!(42));
    driver.close().await.expect("close");
}
