//! Transient annotations left on the captured document.
//!
//! A capture pass records what it found in a [`MarkedElements`] map keyed by node. Each
//! annotation is mirrored onto the element as a `data-pagefreeze-*` attribute so that a
//! serializer can join elements to side-table entries by attribute value.

use std::collections::{BTreeMap, BTreeSet};

use page_dom::{Document, NodeId};
use tracing::trace;

pub const ATTRIBUTE_PREFIX: &str = "data-pagefreeze-";

/// Set by page hooks on lazily loaded images; read (and cleared) by the image handler.
pub const LAZY_LOADED_SRC_ATTRIBUTE: &str = "data-pagefreeze-lazy-loaded-src";
/// Holds the text of a `<noscript>` while the capture runs.
pub const DISABLED_NOSCRIPT_ATTRIBUTE: &str = "data-pagefreeze-disabled-noscript";
/// Attribute a refresh `<meta http-equiv>` is renamed to.
pub const DISABLED_HTTP_EQUIV_ATTRIBUTE: &str = "disabled-http-equiv";
/// Class carried by overlay elements the tool injects into pages; never captured.
pub const UI_ELEMENT_CLASS: &str = "pagefreeze-ui-element";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Marker {
    RemovedContent,
    HiddenContent,
    KeptContent,
    HiddenFrame,
    PreservedSpace,
    ShadowRoot,
    Image,
    Poster,
    Canvas,
    Import,
    InputValue,
    Stylesheet,
    AsyncScript,
    MovableStyle,
    /// `hidden` added to flow content under `<head>`.
    HeadHidden,
}

impl Marker {
    /// Every annotation a capture pass can leave behind.
    pub const ALL: [Marker; 15] = [
        Marker::RemovedContent,
        Marker::HiddenContent,
        Marker::KeptContent,
        Marker::HiddenFrame,
        Marker::PreservedSpace,
        Marker::ShadowRoot,
        Marker::Image,
        Marker::Poster,
        Marker::Canvas,
        Marker::Import,
        Marker::InputValue,
        Marker::Stylesheet,
        Marker::AsyncScript,
        Marker::MovableStyle,
        Marker::HeadHidden,
    ];

    pub const fn attribute(self) -> &'static str {
        match self {
            Marker::RemovedContent => "data-pagefreeze-removed-content",
            Marker::HiddenContent => "data-pagefreeze-hidden-content",
            Marker::KeptContent => "data-pagefreeze-kept-content",
            Marker::HiddenFrame => "data-pagefreeze-hidden-frame",
            Marker::PreservedSpace => "data-pagefreeze-preserved-space-element",
            Marker::ShadowRoot => "data-pagefreeze-shadow-root-element",
            Marker::Image => "data-pagefreeze-image",
            Marker::Poster => "data-pagefreeze-poster",
            Marker::Canvas => "data-pagefreeze-canvas",
            Marker::Import => "data-pagefreeze-import",
            Marker::InputValue => "data-pagefreeze-input-value",
            Marker::Stylesheet => "data-pagefreeze-stylesheet",
            Marker::AsyncScript => "data-pagefreeze-async-script",
            Marker::MovableStyle => "data-pagefreeze-movable-style",
            Marker::HeadHidden => "hidden",
        }
    }

    /// Markers that own a dedicated attribute. `HeadHidden` borrows the standard `hidden`
    /// attribute and is only undone where the capture set it.
    pub fn is_owned_attribute(self) -> bool {
        !matches!(self, Marker::HeadHidden)
    }

    pub fn from_attribute(name: &str) -> Option<Marker> {
        Marker::ALL
            .into_iter()
            .find(|marker| marker.is_owned_attribute() && marker.attribute() == name)
    }
}

/// The undo list of a capture pass: which element received which markers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkedElements {
    entries: BTreeMap<NodeId, BTreeSet<Marker>>,
}

impl MarkedElements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `marker` for `node` and writes its attribute. Marking twice is harmless; the
    /// attribute takes the latest value.
    pub fn mark(&mut self, doc: &mut Document, node: NodeId, marker: Marker, value: &str) {
        doc.set_attribute(node, marker.attribute(), value);
        self.record(node, marker);
    }

    /// Records an annotation without touching the document.
    pub fn record(&mut self, node: NodeId, marker: Marker) {
        trace!(node = node.0, attribute = marker.attribute(), "marked element");
        self.entries.entry(node).or_default().insert(marker);
    }

    pub fn contains(&self, node: NodeId, marker: Marker) -> bool {
        self.entries
            .get(&node)
            .map(|markers| markers.contains(&marker))
            .unwrap_or(false)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn markers(&self, node: NodeId) -> impl Iterator<Item = Marker> + '_ {
        self.entries.get(&node).into_iter().flatten().copied()
    }

    pub fn nodes_with(&self, marker: Marker) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|(_, markers)| markers.contains(&marker))
            .map(|(node, _)| *node)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extend(&mut self, other: MarkedElements) {
        for (node, markers) in other.entries {
            self.entries.entry(node).or_default().extend(markers);
        }
    }

    /// Rebuilds the undo list from the attributes found in `doc`. `HeadHidden` cannot be
    /// recovered this way.
    pub fn from_document(doc: &Document) -> Self {
        let mut marked = Self::new();
        let mut scopes = vec![doc.root()];
        while let Some(scope) = scopes.pop() {
            for node in doc.descendant_elements(scope) {
                if let Some(element) = doc.element(node) {
                    for attr in &element.attrs {
                        if let Some(marker) = Marker::from_attribute(&attr.name) {
                            marked.record(node, marker);
                        }
                    }
                }
                if let Some(shadow) = doc.shadow_root_of(node) {
                    scopes.push(shadow);
                }
            }
        }
        marked
    }

    /// Strips every owned marker attribute from every recorded element, plus `hidden` where
    /// the capture added it. Safe to run more than once.
    pub fn unmark_all(&self, doc: &mut Document) {
        for (node, markers) in &self.entries {
            for marker in Marker::ALL.into_iter().filter(|marker| marker.is_owned_attribute()) {
                doc.remove_attribute(*node, marker.attribute());
            }
            if markers.contains(&Marker::HeadHidden) {
                doc.remove_attribute(*node, Marker::HeadHidden.attribute());
            }
        }
    }
}
