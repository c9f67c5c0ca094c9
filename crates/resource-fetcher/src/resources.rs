//! Resource tables attached to a capture and the concurrent fill pass.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fetcher::{FetchRequest, ResourceFetcher};

/// Resource kind that is never fetched host-side.
pub const FRAMES_KIND: &str = "frames";

const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    pub url: String,
    /// Base64 of the fetched bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ResourceEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: None,
            content_type: None,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.content.is_some()
    }

    pub fn decoded(&self) -> Option<Vec<u8>> {
        self.content
            .as_deref()
            .and_then(|content| STANDARD.decode(content).ok())
    }
}

/// Resources grouped by kind (`images`, `posters`, `frames`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageResources {
    kinds: BTreeMap<String, Vec<ResourceEntry>>,
}

impl PageResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `url` under `kind` unless it is already listed there.
    pub fn add(&mut self, kind: &str, url: impl Into<String>) {
        let url = url.into();
        let entries = self.kinds.entry(kind.to_string()).or_default();
        if !entries.iter().any(|entry| entry.url == url) {
            entries.push(ResourceEntry::new(url));
        }
    }

    pub fn entries(&self, kind: &str) -> &[ResourceEntry] {
        self.kinds.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.kinds.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub fetched: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Whether the entry is eligible for a host-side fetch.
pub fn should_fetch(kind: &str, entry: &ResourceEntry) -> bool {
    kind != FRAMES_KIND
        && !entry.url.is_empty()
        && !entry.url.starts_with("data:")
        && !entry.is_filled()
}

/// Fetches every eligible entry concurrently and stores the bytes base64-encoded. A failed
/// fetch leaves its entry without content and does not affect the others.
pub async fn fill_page_resources<F>(
    fetcher: &F,
    resources: &mut PageResources,
    request: &FetchRequest,
) -> FillReport
where
    F: ResourceFetcher + ?Sized,
{
    fill_page_resources_with_limit(fetcher, resources, request, DEFAULT_CONCURRENCY).await
}

pub async fn fill_page_resources_with_limit<F>(
    fetcher: &F,
    resources: &mut PageResources,
    request: &FetchRequest,
    concurrency: usize,
) -> FillReport
where
    F: ResourceFetcher + ?Sized,
{
    let mut report = FillReport::default();
    let mut pending = Vec::new();
    for (kind, entries) in &resources.kinds {
        for (index, entry) in entries.iter().enumerate() {
            if should_fetch(kind, entry) {
                pending.push((kind.clone(), index, entry.url.clone()));
            } else {
                report.skipped += 1;
            }
        }
    }

    let results = stream::iter(pending)
        .map(|(kind, index, url)| async move {
            let result = fetcher.fetch(&url, request).await;
            (kind, index, url, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    for (kind, index, url, result) in results {
        match result {
            Ok(resource) => {
                if let Some(entry) = resources
                    .kinds
                    .get_mut(&kind)
                    .and_then(|entries| entries.get_mut(index))
                {
                    entry.content = Some(STANDARD.encode(&resource.bytes));
                    entry.content_type = resource.content_type;
                }
                report.fetched += 1;
            }
            Err(err) => {
                warn!(%kind, %url, %err, "resource fetch failed");
                report.failed += 1;
            }
        }
    }
    debug!(
        fetched = report.fetched,
        failed = report.failed,
        skipped = report.skipped,
        "page resources filled"
    );
    report
}
