//! One capture run: load the page, snapshot it, extract its state, fetch referenced
//! resources.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cdp_adapter::{navigate_with_fallback, BrowserDriver, NavigateOptions};
use page_capture::{
    post_process, pre_process, AnyShadowRoot, CaptureEnv, CaptureOptions, LivePage, NoFontFaces,
    OpenShadowRootOnly, PageCaptureResult, LIVE_TREE_SCRIPT,
};
use page_dom::{document_html, Document};
use pagefreeze_core_types::{CaptureRoute, CoreError, PageId};
use resource_fetcher::{
    fill_page_resources_with_limit, FetchRequest, FillReport, PageResources, ResourceFetcher,
};
use serde::Serialize;
use serde_json::json;
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use crate::config::AppConfig;
use crate::errors::PipelineError;

pub const IMAGES_KIND: &str = "images";

#[derive(Clone, Debug)]
pub struct CaptureRequest {
    pub url: String,
    pub options: CaptureOptions,
    pub navigate: NavigateOptions,
    pub wait_delay: Duration,
    /// `None` skips the resource pass.
    pub fetch: Option<FetchRequest>,
    pub fetch_concurrency: usize,
}

impl CaptureRequest {
    pub fn from_config(url: impl Into<String>, config: &AppConfig) -> Self {
        let fetch = config.fetch.enabled.then(|| FetchRequest {
            headers: config.browser.extra_headers.clone(),
            timeout: (config.fetch.timeout_ms > 0)
                .then(|| Duration::from_millis(config.fetch.timeout_ms)),
        });
        Self {
            url: url.into(),
            options: config.capture.clone(),
            navigate: NavigateOptions {
                timeout: config.browser.load_timeout(),
                wait_policy: config.browser.wait_until,
            },
            wait_delay: Duration::from_millis(config.browser.wait_delay_ms),
            fetch,
            fetch_concurrency: config.fetch.concurrency,
        }
    }
}

/// Result of a capture run, written out as one JSON record.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutput {
    pub route: CaptureRoute,
    /// Serialized page carrying the `data-pagefreeze-*` markers that index into `page_data`.
    pub content: String,
    pub page_data: PageCaptureResult,
    pub resources: PageResources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_report: Option<FillReport>,
}

/// Captures the page at `request.url` through `driver`.
pub async fn capture_page(
    driver: &dyn BrowserDriver,
    fetcher: Option<&dyn ResourceFetcher>,
    request: &CaptureRequest,
) -> Result<CaptureOutput, PipelineError> {
    let url = validate_url(&request.url)?;
    let route = CaptureRoute::new(PageId::new(), url.as_str());
    info!(%route, "capture started");

    navigate_with_fallback(driver, url.as_str(), request.navigate).await?;
    if !request.wait_delay.is_zero() {
        debug!(delay_ms = request.wait_delay.as_millis() as u64, "post-load wait");
        sleep(request.wait_delay).await;
    }

    let snapshot = driver
        .evaluate_in_page(
            LIVE_TREE_SCRIPT,
            json!({ "sampleStyles": request.options.needs_render_styles() }),
        )
        .await?;
    let LivePage {
        mut document,
        render,
    } = LivePage::from_json(snapshot)?;

    let env = CaptureEnv {
        render: Some(&render),
        shadows: &AnyShadowRoot,
        fonts: &render,
    };
    let (content, page_data) = extract(&mut document, &env, &request.options);

    let mut resources = collect_resources(&page_data);
    let fill_report = match (fetcher, &request.fetch) {
        (Some(fetcher), Some(fetch)) => Some(
            fill_page_resources_with_limit(
                fetcher,
                &mut resources,
                fetch,
                request.fetch_concurrency,
            )
            .await,
        ),
        _ => None,
    };

    info!(
        %route,
        bytes = content.len(),
        resources = resources.len(),
        "capture finished"
    );
    Ok(CaptureOutput {
        route,
        content,
        page_data,
        resources,
        fill_report,
    })
}

/// Captures already-available markup without a browser. Only the static passes run.
pub fn capture_static(
    markup: &str,
    url: Option<&str>,
    options: &CaptureOptions,
) -> Result<CaptureOutput, PipelineError> {
    let url = match url {
        Some(url) => validate_url(url)?.to_string(),
        None => String::new(),
    };
    let mut document = page_dom::parse_html(markup);
    document.url = (!url.is_empty()).then(|| url.clone());
    let route = CaptureRoute::new(PageId::new(), url);

    let env = CaptureEnv {
        render: None,
        shadows: &OpenShadowRootOnly,
        fonts: &NoFontFaces,
    };
    let (content, page_data) = extract(&mut document, &env, options);
    let resources = collect_resources(&page_data);
    Ok(CaptureOutput {
        route,
        content,
        page_data,
        resources,
        fill_report: None,
    })
}

/// Runs the pre-processor, serializes the annotated page, then restores the document.
fn extract(
    document: &mut Document,
    env: &CaptureEnv<'_>,
    options: &CaptureOptions,
) -> (String, PageCaptureResult) {
    let page_data = pre_process(document, env, options);
    let content = document_html(document);
    post_process(document, Some(&page_data.marked_elements));
    (content, page_data)
}

fn collect_resources(page_data: &PageCaptureResult) -> PageResources {
    let mut resources = PageResources::new();
    for image in &page_data.images {
        if !image.current_src.is_empty() {
            resources.add(IMAGES_KIND, image.current_src.clone());
        }
    }
    resources
}

fn validate_url(raw: &str) -> Result<Url, CoreError> {
    Url::parse(raw.trim()).map_err(|_| CoreError::InvalidUrl(raw.to_string()))
}

/// Writes `output` as `<dir>/<capture id>.json` and returns the path.
pub async fn write_output(dir: &Path, output: &CaptureOutput) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|source| PipelineError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    let path = dir.join(format!("{}.json", output.route.capture.0));
    let encoded = serde_json::to_vec_pretty(output)?;
    fs::write(&path, encoded)
        .await
        .map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), "capture written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_capture_serializes_annotated_markup() {
        let markup = "<html><head><meta http-equiv=refresh content=5><noscript>no js</noscript>\
                      </head><body><p>text</p></body></html>";
        let output =
            capture_static(markup, Some("https://example.com/"), &CaptureOptions::default())
                .unwrap();
        assert!(output.content.contains("disabled-http-equiv"));
        assert!(output.content.contains("data-pagefreeze-disabled-noscript"));
        assert!(output.page_data.canvases.is_empty());
        assert!(output.resources.is_empty());
        assert_eq!(output.route.url, "https://example.com/");
    }

    #[test]
    fn rejects_relative_urls() {
        let err = capture_static("<p>", Some("not a url"), &CaptureOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Core(CoreError::InvalidUrl(_))));
    }

    #[test]
    fn request_follows_config() {
        let mut config = AppConfig::default();
        config.fetch.enabled = false;
        config.browser.wait_delay_ms = 1500;
        let request = CaptureRequest::from_config("https://example.com", &config);
        assert!(request.fetch.is_none());
        assert_eq!(request.wait_delay, Duration::from_millis(1500));
        assert_eq!(request.navigate.wait_policy, config.browser.wait_until);
    }
}
