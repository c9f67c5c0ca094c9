//! JSON shape returned by [`super::LIVE_TREE_SCRIPT`].
//!
//! Nodes arrive as a flat pre-order list with parent indices so that deep pages never hit
//! the nesting limit of the JSON reader.

use serde::{Deserialize, Serialize};

use crate::model::FontFaceData;
use crate::style::{ComputedStyle, Rect};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveSnapshot {
    pub url: Option<String>,
    pub referrer: String,
    pub nodes: Vec<LiveNode>,
    pub fonts: Vec<FontFaceData>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LiveNode {
    Element(LiveElement),
    Text(LiveCharacterData),
    Comment(LiveCharacterData),
    Doctype(LiveDoctype),
    ShadowRoot(LiveShadowRoot),
}

impl LiveNode {
    pub fn parent(&self) -> Option<usize> {
        match self {
            LiveNode::Element(element) => element.parent,
            LiveNode::Text(data) | LiveNode::Comment(data) => data.parent,
            LiveNode::Doctype(doctype) => doctype.parent,
            LiveNode::ShadowRoot(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveElement {
    pub parent: Option<usize>,
    pub local_name: String,
    pub namespace: String,
    pub attributes: Vec<LiveAttribute>,
    pub style: Option<ComputedStyle>,
    pub first_letter: Option<ComputedStyle>,
    pub before: Option<ComputedStyle>,
    pub after: Option<ComputedStyle>,
    pub rect: Option<Rect>,
    pub client_width: u32,
    pub client_height: u32,
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub selected: Option<bool>,
    #[serde(rename = "async")]
    pub async_script: Option<bool>,
    pub current_src: Option<String>,
    /// `None` when the canvas was tainted or the element is not a canvas.
    pub canvas: Option<String>,
    pub video_frame: Option<String>,
    /// `None` when the sheet could not be read.
    pub sheet_rules: Option<Vec<String>>,
    pub import: Option<Box<LiveSnapshot>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveCharacterData {
    pub parent: Option<usize>,
    pub data: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveDoctype {
    pub parent: Option<usize>,
    pub name: String,
    pub public_id: String,
    pub system_id: String,
    pub internal_subset: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveShadowRoot {
    pub host: usize,
    pub mode: String,
    pub delegates_focus: bool,
    pub adopted_style_sheets: Vec<Vec<String>>,
}
