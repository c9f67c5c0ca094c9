//! Serializable side-tables produced by a capture pass.

use serde::{Deserialize, Serialize};

use crate::markers::MarkedElements;

/// 1x1 transparent GIF recorded in place of images the reader cannot see.
pub const EMPTY_IMAGE_DATA_URI: &str =
    "data:image/gif;base64,R0lGODlhAQABAAAAACH5BAEKAAEALAAAAAABAAEAAAICTAEAOw==";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasData {
    #[serde(rename = "dataURI")]
    pub data_uri: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub current_src: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowRootInfo {
    pub content: String,
    pub delegates_focus: bool,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adopted_style_sheets: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportData {
    pub content: String,
}

/// `(family, weight, style, variant)`, serialized as a 4-element array.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsedFont(pub String, pub String, pub String, pub String);

impl UsedFont {
    pub fn family(&self) -> &str {
        &self.0
    }

    /// Canonical dedup key: the JSON encoding of the tuple.
    pub fn key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("[{:?},{:?},{:?},{:?}]", self.0, self.1, self.2, self.3)
        })
    }
}

/// A `FontFace` declared by the page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontFaceData {
    pub family: String,
    pub style: String,
    pub weight: String,
    pub stretch: String,
    pub unicode_range: String,
    pub display: String,
    pub status: String,
}

/// Everything a capture pass extracted from one document.
///
/// Every `canvases`, `images`, `posters`, `shadowRoots` and `imports` entry is joined to
/// its element by a marker attribute holding the entry index. `stylesheets` is sparse and
/// aligned with the index of the `<style>` element in the document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCaptureResult {
    pub canvases: Vec<CanvasData>,
    pub fonts: Vec<FontFaceData>,
    pub stylesheets: Vec<Option<String>>,
    pub images: Vec<ImageData>,
    pub posters: Vec<String>,
    pub used_fonts: Vec<UsedFont>,
    pub shadow_roots: Vec<ShadowRootInfo>,
    pub imports: Vec<ImportData>,
    pub referrer: String,
    /// Undo list for [`crate::post_process`]. Node ids only mean something for the
    /// document that was captured, so they never leave the process.
    #[serde(skip)]
    pub marked_elements: MarkedElements,
}

impl PageCaptureResult {
    pub fn stylesheet(&self, index: usize) -> Option<&str> {
        self.stylesheets.get(index)?.as_deref()
    }
}
