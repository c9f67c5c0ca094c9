//! End-to-end capture runs against a scripted browser driver and fetcher.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{
    AdapterError, AdapterErrorKind, BrowserDriver, HostFunction, NavigateOptions, WaitPolicy,
};
use page_capture::CaptureOptions;
use pagefreeze_cli::{capture_page, write_output, AppConfig, CaptureRequest, PipelineError};
use resource_fetcher::{FetchError, FetchRequest, FetchedResource, ResourceFetcher};
use serde_json::{json, Value};

/// Answers every evaluation with a canned live-tree snapshot. `styled` stands in for the
/// snapshot the page produces when asked to sample computed styles.
struct ScriptedDriver {
    snapshot: Value,
    styled: Option<Value>,
    idle_times_out: bool,
    navigations: Mutex<Vec<WaitPolicy>>,
    evaluations: Mutex<Vec<Value>>,
}

impl ScriptedDriver {
    fn new(snapshot: Value) -> Self {
        Self {
            snapshot,
            styled: None,
            idle_times_out: false,
            navigations: Mutex::new(Vec::new()),
            evaluations: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&self, _url: &str, options: NavigateOptions) -> Result<(), AdapterError> {
        self.navigations.lock().unwrap().push(options.wait_policy);
        if self.idle_times_out && options.wait_policy == WaitPolicy::NetworkIdle {
            return Err(AdapterError::new(AdapterErrorKind::NavTimeout));
        }
        Ok(())
    }

    async fn evaluate_in_page(&self, function: &str, args: Value) -> Result<Value, AdapterError> {
        assert!(function.contains("snapshotDocument"));
        let sampled = args["sampleStyles"] == json!(true);
        self.evaluations.lock().unwrap().push(args);
        match &self.styled {
            Some(styled) if sampled => Ok(styled.clone()),
            _ => Ok(self.snapshot.clone()),
        }
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

struct StaticFetcher;

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(
        &self,
        url: &str,
        _request: &FetchRequest,
    ) -> Result<FetchedResource, FetchError> {
        if url.ends_with("broken.png") {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            });
        }
        Ok(FetchedResource {
            bytes: b"png".to_vec(),
            content_type: Some("image/png".into()),
        })
    }
}

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

fn element(parent: Option<usize>, local_name: &str, extra: Value) -> Value {
    let mut entry = json!({
        "type": "element",
        "parent": parent,
        "localName": local_name,
        "namespace": HTML_NS,
        "attributes": [],
    });
    if let (Some(entry), Some(extra)) = (entry.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            entry.insert(key.clone(), value.clone());
        }
    }
    entry
}

fn snapshot() -> Value {
    json!({
        "url": "https://example.com/",
        "referrer": "https://search.example/",
        "nodes": [
            { "type": "doctype", "parent": null, "name": "html", "publicId": "", "systemId": "" },
            element(None, "html", json!({})),
            element(Some(1), "head", json!({})),
            element(Some(2), "style", json!({
                "sheetRules": ["p { color: blue; }", "em { color: green; }"]
            })),
            { "type": "text", "parent": 3, "data": "p { color: blue; }" },
            element(Some(1), "body", json!({})),
            element(Some(5), "img", json!({
                "attributes": [{ "name": "src", "value": "a.png" }],
                "currentSrc": "https://cdn.example/a.png"
            })),
            element(Some(5), "img", json!({ "currentSrc": "https://cdn.example/broken.png" })),
            element(Some(5), "canvas", json!({ "canvas": "data:image/png;base64,AAAA" })),
            element(Some(5), "x-card", json!({})),
            { "type": "shadowRoot", "parent": null, "host": 9, "mode": "closed",
              "delegatesFocus": false, "adoptedStyleSheets": [] },
            element(Some(10), "p", json!({})),
            { "type": "text", "parent": 11, "data": "shadow text" },
            element(Some(5), "input", json!({ "value": "typed" }))
        ],
        "fonts": [{ "family": "Inter", "style": "normal", "weight": "400", "status": "loaded" }]
    })
}

fn request() -> CaptureRequest {
    let mut config = AppConfig::default();
    config.browser.wait_delay_ms = 0;
    let mut request = CaptureRequest::from_config("https://example.com/", &config);
    request.navigate.timeout = Some(Duration::from_secs(1));
    request
}

#[tokio::test]
async fn captures_live_state_and_fills_resources() {
    let driver = ScriptedDriver::new(snapshot());
    let output = capture_page(&driver, Some(&StaticFetcher), &request())
        .await
        .expect("capture succeeds");

    let data = &output.page_data;
    assert_eq!(data.referrer, "https://search.example/");
    assert_eq!(data.canvases[0].data_uri, "data:image/png;base64,AAAA");
    assert_eq!(data.images.len(), 2);
    assert_eq!(data.images[0].current_src, "https://cdn.example/a.png");
    assert_eq!(data.shadow_roots.len(), 1);
    assert_eq!(data.shadow_roots[0].mode, "closed");
    assert!(data.shadow_roots[0].content.contains("shadow text"));
    assert_eq!(data.fonts[0].family, "Inter");
    assert_eq!(
        data.stylesheet(0),
        Some("p { color: blue; }\nem { color: green; }")
    );

    assert!(output.content.contains(r#"data-pagefreeze-canvas="0""#));
    assert!(output.content.contains(r#"data-pagefreeze-image="1""#));
    assert!(output.content.contains(r#"data-pagefreeze-shadow-root-element="0""#));
    assert!(output.content.contains(r#"data-pagefreeze-input-value="typed""#));
    assert!(output.content.contains(r#"data-pagefreeze-stylesheet="0""#));

    let images = output.resources.entries("images");
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].decoded(), Some(b"png".to_vec()));
    assert!(images[1].content.is_none());
    let report = output.fill_report.expect("fill ran");
    assert_eq!((report.fetched, report.failed), (1, 1));

    let evaluations = driver.evaluations.lock().unwrap();
    assert_eq!(evaluations[0], json!({ "sampleStyles": false }));
}

#[tokio::test]
async fn network_idle_timeout_recovers_with_load() {
    let mut driver = ScriptedDriver::new(snapshot());
    driver.idle_times_out = true;
    capture_page(&driver, None, &request())
        .await
        .expect("load fallback succeeds");
    assert_eq!(
        *driver.navigations.lock().unwrap(),
        vec![WaitPolicy::NetworkIdle, WaitPolicy::Load]
    );
}

#[tokio::test]
async fn skips_resource_pass_without_fetcher() {
    let driver = ScriptedDriver::new(snapshot());
    let output = capture_page(&driver, None, &request()).await.unwrap();
    assert!(output.fill_report.is_none());
    assert!(output
        .resources
        .entries("images")
        .iter()
        .all(|entry| entry.content.is_none()));
}

#[tokio::test]
async fn malformed_snapshot_is_a_capture_error() {
    let driver = ScriptedDriver::new(json!({ "nodes": [{ "type": "element", "parent": 7 }] }));
    let err = capture_page(&driver, None, &request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Capture(_)));
}

#[tokio::test]
async fn writes_json_record() {
    let driver = ScriptedDriver::new(snapshot());
    let output = capture_page(&driver, Some(&StaticFetcher), &request())
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = write_output(&dir.path().join("out"), &output).await.unwrap();

    let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(written["route"]["url"], "https://example.com/");
    assert_eq!(written["pageData"]["canvases"][0]["dataURI"], "data:image/png;base64,AAAA");
    assert_eq!(written["resources"]["images"][0]["contentType"], "image/png");
    assert!(written["content"]
        .as_str()
        .unwrap()
        .starts_with("<!DOCTYPE html>"));
    assert!(written["pageData"].get("markedElements").is_none());
}

fn body_style_page(sampled: bool) -> Value {
    let style = if sampled {
        json!({
            "style": { "display": "none" },
            "rect": { "x": 0.0, "y": 0.0, "width": 0.0, "height": 0.0 }
        })
    } else {
        json!({})
    };
    json!({
        "url": "https://example.com/",
        "nodes": [
            element(None, "html", json!({})),
            element(Some(0), "head", json!({})),
            element(Some(0), "body", json!({})),
            element(Some(2), "style", style),
            { "type": "text", "parent": 3, "data": "p { margin: 0; }" }
        ]
    })
}

#[tokio::test]
async fn moving_styles_alone_samples_render_styles() {
    let mut driver = ScriptedDriver::new(body_style_page(false));
    driver.styled = Some(body_style_page(true));
    let mut request = request();
    request.options = CaptureOptions {
        move_styles_in_head: true,
        ..CaptureOptions::default()
    };

    let output = capture_page(&driver, None, &request).await.unwrap();
    assert_eq!(
        driver.evaluations.lock().unwrap()[0],
        json!({ "sampleStyles": true })
    );
    assert!(
        output.content.contains(r#"<style data-pagefreeze-movable-style="">"#),
        "body style not marked movable: {}",
        output.content
    );
}
