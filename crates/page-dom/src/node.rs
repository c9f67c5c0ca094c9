//! Node payloads stored in the document arena.

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Stable identity of a node inside one [`Document`] arena.
///
/// Ids are never reused: detaching a node keeps its slot alive so that side tables keyed by
/// `NodeId` stay valid for the whole capture pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
    Other(String),
}

impl Namespace {
    pub const HTML_URI: &'static str = "http://www.w3.org/1999/xhtml";
    pub const SVG_URI: &'static str = "http://www.w3.org/2000/svg";
    pub const MATHML_URI: &'static str = "http://www.w3.org/1998/Math/MathML";

    pub fn from_uri(uri: &str) -> Self {
        match uri {
            "" | Self::HTML_URI => Namespace::Html,
            Self::SVG_URI => Namespace::Svg,
            Self::MATHML_URI => Namespace::MathMl,
            other => Namespace::Other(other.to_string()),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Namespace::Html => Self::HTML_URI,
            Namespace::Svg => Self::SVG_URI,
            Namespace::MathMl => Self::MATHML_URI,
            Namespace::Other(uri) => uri,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowRootMode {
    Open,
    Closed,
}

impl ShadowRootMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShadowRootMode::Open => "open",
            ShadowRootMode::Closed => "closed",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Doctype {
    pub name: String,
    pub public_id: String,
    pub system_id: String,
    pub internal_subset: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Runtime state of an element that is not reflected in its markup.
///
/// `None` means "not observed"; readers fall back to the value implied by the attributes,
/// which is what a freshly parsed page would report.
#[derive(Clone, Debug, Default)]
pub struct ElementProps {
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub selected: Option<bool>,
    pub async_script: Option<bool>,
    pub current_src: Option<String>,
    pub import_document: Option<Box<Document>>,
}

#[derive(Clone, Debug)]
pub struct ElementData {
    pub local_name: String,
    pub namespace: Namespace,
    pub attrs: Vec<Attribute>,
    pub props: ElementProps,
    pub shadow_root: Option<NodeId>,
}

impl ElementData {
    pub fn new(local_name: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            local_name: local_name.into(),
            namespace,
            attrs: Vec::new(),
            props: ElementProps::default(),
            shadow_root: None,
        }
    }

    pub fn is_html(&self) -> bool {
        self.namespace == Namespace::Html
    }

    pub fn is_svg(&self) -> bool {
        self.namespace == Namespace::Svg
    }

    /// `tagName` as a browser reports it: upper-cased for HTML, verbatim otherwise.
    pub fn tag_name(&self) -> String {
        if self.is_html() {
            self.local_name.to_ascii_uppercase()
        } else {
            self.local_name.clone()
        }
    }

    pub fn is(&self, local_name: &str) -> bool {
        self.is_html() && self.local_name.eq_ignore_ascii_case(local_name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attrs.iter().any(|attr| attr.name == name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|value| value.split_ascii_whitespace().any(|item| item == class))
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct ShadowRootData {
    pub host: NodeId,
    pub mode: ShadowRootMode,
    pub delegates_focus: bool,
    /// One entry per adopted sheet, each holding the `cssText` of its rules.
    pub adopted_style_sheets: Vec<Vec<String>>,
}

#[derive(Clone, Debug)]
pub enum NodeData {
    Document,
    Doctype(Doctype),
    Element(ElementData),
    Text(String),
    Comment(String),
    ShadowRoot(ShadowRootData),
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }
}
