use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, Headers, SetCookiesParams, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams, SetBypassCspParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    AddBindingParams, EvaluateParams, EventBindingCalled,
};
use chromiumoxide::page::Page;
use dashmap::DashMap;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{BrowserCookie, CdpConfig};
use crate::driver::{BrowserDriver, HostFunction, NavigateOptions, WaitPolicy};
use crate::error::{AdapterError, AdapterErrorKind};

const BINDING_PREFIX: &str = "__pagefreeze_binding_";
const DEBUG_ATTACH_DELAY: Duration = Duration::from_secs(3);
const NETWORK_IDLE_POLL_MS: u64 = 100;
const NETWORK_IDLE_QUIET_MS: u64 = 500;

/// Resolves once no new resource entries showed up for a quiet period.
const NETWORK_IDLE_SCRIPT: &str = r#"(poll, quiet) => new Promise(resolve => {
	let last = -1;
	let stable = 0;
	const tick = () => {
		const count = performance.getEntriesByType("resource").length;
		if (count === last) {
			stable += poll;
			if (stable >= quiet) {
				resolve(count);
				return;
			}
		} else {
			last = count;
			stable = 0;
		}
		setTimeout(tick, poll);
	};
	tick();
})"#;

const READY_STATE_SCRIPT: &str = r#"() => new Promise(resolve => {
	if (document.readyState !== "loading") {
		resolve(document.readyState);
	} else {
		document.addEventListener("DOMContentLoaded", () => resolve(document.readyState), { once: true });
	}
})"#;

const SETTLE_CALL_SCRIPT: &str = r#"(id, ok, value) => {
	const callbacks = globalThis.__pagefreezeCallbacks;
	const entry = callbacks && callbacks.get(id);
	if (entry) {
		callbacks.delete(id);
		ok ? entry.resolve(value) : entry.reject(new Error(value));
	}
}"#;

#[derive(Debug, Deserialize)]
struct BindingCall {
    id: String,
    #[serde(default)]
    args: Vec<Value>,
}

/// [`BrowserDriver`] backed by a locally launched Chromium.
pub struct ChromiumDriver {
    config: CdpConfig,
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    bindings: Arc<DashMap<String, HostFunction>>,
    binding_listener: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumDriver {
    pub async fn launch(config: CdpConfig) -> Result<Self, AdapterError> {
        let browser_config = browser_config(&config)?;
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("failed to launch chromium: {err}"))
                .with_data(json!({
                    "executable": config.executable,
                    "hint": "Set PAGEFREEZE_CHROME to the full path of chrome/chromium."
                }))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(cdp_error(err));
            }
        };

        let driver = Self {
            config,
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            bindings: Arc::new(DashMap::new()),
            binding_listener: Mutex::new(None),
        };
        driver.prepare_page().await?;
        info!(
            headless = driver.config.effective_headless(),
            executable = %driver.config.executable.display(),
            "chromium driver ready"
        );
        Ok(driver)
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn prepare_page(&self) -> Result<(), AdapterError> {
        let config = &self.config;
        if config.bypass_csp {
            self.page
                .execute(SetBypassCspParams::new(true))
                .await
                .map_err(cdp_error)?;
        }
        if let Some(viewport) = config.viewport {
            self.page
                .execute(SetDeviceMetricsOverrideParams::new(
                    i64::from(viewport.width),
                    i64::from(viewport.height),
                    1.0,
                    false,
                ))
                .await
                .map_err(cdp_error)?;
        }
        if let Some(user_agent) = &config.user_agent {
            self.page
                .set_user_agent(user_agent.as_str())
                .await
                .map_err(cdp_error)?;
        }
        if !config.extra_headers.is_empty() {
            let headers = serde_json::to_value(&config.extra_headers).map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string())
            })?;
            self.page
                .execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
                .await
                .map_err(cdp_error)?;
        }
        if !config.cookies.is_empty() {
            let cookies = config.cookies.iter().map(cookie_param).collect::<Vec<_>>();
            self.page
                .execute(SetCookiesParams::new(cookies))
                .await
                .map_err(cdp_error)?;
        }
        if config.debug {
            debug!("waiting for devtools before navigation");
            sleep(DEBUG_ATTACH_DELAY).await;
        }
        Ok(())
    }

    async fn navigate_inner(&self, url: &str, policy: WaitPolicy) -> Result<(), AdapterError> {
        match policy {
            WaitPolicy::DomContentLoaded => {
                let response = self
                    .page
                    .execute(NavigateParams::new(url))
                    .await
                    .map_err(cdp_error)?;
                if let Some(error_text) = &response.result.error_text {
                    return Err(AdapterError::new(AdapterErrorKind::NavFailed)
                        .with_hint(format!("{url}: {error_text}")));
                }
                self.call_function(READY_STATE_SCRIPT, &[]).await?;
            }
            WaitPolicy::Load => {
                self.page.goto(url).await.map_err(navigation_error)?;
            }
            WaitPolicy::NetworkIdle => {
                self.page.goto(url).await.map_err(navigation_error)?;
                self.call_function(
                    NETWORK_IDLE_SCRIPT,
                    &[json!(NETWORK_IDLE_POLL_MS), json!(NETWORK_IDLE_QUIET_MS)],
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn call_function(&self, function: &str, args: &[Value]) -> Result<Value, AdapterError> {
        evaluate_function(&self.page, function, args).await
    }

    async fn ensure_binding_listener(&self) -> Result<(), AdapterError> {
        let mut listener = self.binding_listener.lock().await;
        if listener.is_some() {
            return Ok(());
        }
        let mut events = self
            .page
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(cdp_error)?;
        let page = self.page.clone();
        let bindings = Arc::clone(&self.bindings);
        *listener = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let Some(function) = bindings.get(&event.name).map(|entry| Arc::clone(entry.value()))
                else {
                    continue;
                };
                let call: BindingCall = match serde_json::from_str(&event.payload) {
                    Ok(call) => call,
                    Err(err) => {
                        warn!(binding = %event.name, %err, "malformed binding payload");
                        continue;
                    }
                };
                let (ok, value) = match function(call.args) {
                    Ok(value) => (true, value),
                    Err(message) => (false, Value::String(message)),
                };
                let settle = [Value::String(call.id), Value::Bool(ok), value];
                if let Err(err) = evaluate_function(&page, SETTLE_CALL_SCRIPT, &settle).await {
                    warn!(binding = %event.name, %err, "failed to settle host call");
                }
            }
        }));
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, options: NavigateOptions) -> Result<(), AdapterError> {
        debug!(%url, policy = %options.wait_policy, "navigating");
        let navigation = self.navigate_inner(url, options.wait_policy);
        match options.timeout {
            Some(limit) => timeout(limit, navigation).await.map_err(|_| {
                AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!(
                        "{url} not ready ({}) after {}ms",
                        options.wait_policy,
                        limit.as_millis()
                    ))
                    .retriable(true)
            })?,
            None => navigation.await,
        }
    }

    async fn evaluate_in_page(&self, function: &str, args: Value) -> Result<Value, AdapterError> {
        self.call_function(function, &[args]).await
    }

    async fn expose_host_function(
        &self,
        name: &str,
        function: HostFunction,
    ) -> Result<(), AdapterError> {
        let binding = format!("{BINDING_PREFIX}{name}");
        self.bindings.insert(binding.clone(), function);
        self.ensure_binding_listener().await?;
        self.page
            .execute(AddBindingParams::new(binding.clone()))
            .await
            .map_err(cdp_error)?;

        let installer = binding_installer(name, &binding)?;
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(installer.clone()))
            .await
            .map_err(cdp_error)?;
        evaluate_expression(&self.page, installer).await?;
        debug!(%name, "host function exposed");
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        if let Some(listener) = self.binding_listener.lock().await.take() {
            listener.abort();
        }
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        browser.close().await.map_err(cdp_error)?;
        if let Err(err) = browser.wait().await {
            debug!(%err, "browser process did not exit cleanly");
        }
        self.handler.abort();
        Ok(())
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn browser_config(config: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    if !config.executable.as_os_str().is_empty() && !config.executable.exists() {
        return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
            .with_hint(format!(
                "chrome executable not found at {}",
                config.executable.display()
            ))
            .with_data(json!({
                "expected": config.executable,
                "hint": "Set PAGEFREEZE_CHROME to the full path of chrome/chromium."
            })));
    }

    let mut builder = BrowserConfig::builder().launch_timeout(Duration::from_secs(20));
    if let Some(limit) = config.load_timeout() {
        builder = builder.request_timeout(limit);
    }
    if !config.effective_headless() {
        builder = builder.with_head();
    }
    if let Some(viewport) = config.viewport {
        builder = builder.window_size(viewport.width, viewport.height);
    }

    let mut args = vec![
        "--disable-background-networking".to_string(),
        "--disable-breakpad".to_string(),
        "--disable-component-update".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-extensions".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--password-store=basic".to_string(),
        "--use-mock-keychain".to_string(),
    ];
    if config.effective_headless() {
        args.push("--hide-scrollbars".to_string());
        args.push("--mute-audio".to_string());
    }
    args.extend(config.args.iter().cloned());
    builder = builder.args(args);

    if !config.executable.as_os_str().is_empty() {
        builder = builder.chrome_executable(config.executable.clone());
    }
    if let Some(dir) = &config.user_data_dir {
        builder = builder.user_data_dir(PathBuf::from(dir));
    }

    builder.build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("browser config error: {err}"))
    })
}

fn cookie_param(cookie: &BrowserCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.url = cookie.url.clone();
    param.domain = cookie.domain.clone();
    param.path = cookie.path.clone();
    param.secure = cookie.secure;
    param.http_only = cookie.http_only;
    param
}

/// Script installing `globalThis[name]` as a promise-returning proxy over the CDP binding.
fn binding_installer(name: &str, binding: &str) -> Result<String, AdapterError> {
    let name = serde_json::to_string(name)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))?;
    let binding = serde_json::to_string(binding)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))?;
    Ok(format!(
        r#"(() => {{
	const name = {name};
	const binding = {binding};
	const callbacks = globalThis.__pagefreezeCallbacks || (globalThis.__pagefreezeCallbacks = new Map());
	let sequence = 0;
	globalThis[name] = (...args) => new Promise((resolve, reject) => {{
		const id = name + ":" + (++sequence);
		callbacks.set(id, {{ resolve, reject }});
		globalThis[binding](JSON.stringify({{ id, args }}));
	}});
}})()"#
    ))
}

async fn evaluate_function(
    page: &Page,
    function: &str,
    args: &[Value],
) -> Result<Value, AdapterError> {
    let args = serde_json::to_string(args)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))?;
    evaluate_expression(page, format!("({function})(...{args})")).await
}

async fn evaluate_expression(page: &Page, expression: String) -> Result<Value, AdapterError> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err))?;
    let result = page.evaluate_expression(params).await.map_err(|err| {
        AdapterError::new(AdapterErrorKind::EvaluationFailed).with_hint(err.to_string())
    })?;
    Ok(result.value().cloned().unwrap_or(Value::Null))
}

fn cdp_error(err: impl std::fmt::Display) -> AdapterError {
    AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string())
}

fn navigation_error(err: impl std::fmt::Display) -> AdapterError {
    AdapterError::new(AdapterErrorKind::NavFailed).with_hint(err.to_string())
}
