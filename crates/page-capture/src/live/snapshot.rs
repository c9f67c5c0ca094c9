use std::collections::HashMap;

use page_dom::{Attribute, Doctype, Document, Namespace, NodeId, ShadowRootMode};
use tracing::debug;

use super::wire::{LiveElement, LiveNode, LiveSnapshot};
use crate::errors::CaptureError;
use crate::model::FontFaceData;
use crate::ports::{FontFaceSource, RenderPort};
use crate::style::{ComputedStyle, PseudoElement, Rect};

/// Rendered state recorded for one element.
#[derive(Clone, Debug, Default)]
struct ElementRender {
    style: Option<ComputedStyle>,
    first_letter: Option<ComputedStyle>,
    before: Option<ComputedStyle>,
    after: Option<ComputedStyle>,
    rect: Option<Rect>,
    client_size: (u32, u32),
    canvas: Option<String>,
    video_frame: Option<String>,
    sheet_rules: Option<Vec<String>>,
}

/// Render context answering from a snapshot taken inside the page.
#[derive(Clone, Debug, Default)]
pub struct SnapshotRender {
    elements: HashMap<NodeId, ElementRender>,
    fonts: Vec<FontFaceData>,
}

impl SnapshotRender {
    fn element(&self, node: NodeId) -> Option<&ElementRender> {
        self.elements.get(&node)
    }
}

impl RenderPort for SnapshotRender {
    fn computed_style(&self, node: NodeId, pseudo: Option<PseudoElement>) -> Option<ComputedStyle> {
        let element = self.element(node)?;
        match pseudo {
            None => element.style.clone(),
            Some(PseudoElement::FirstLetter) => element.first_letter.clone(),
            Some(PseudoElement::Before) => element.before.clone(),
            Some(PseudoElement::After) => element.after.clone(),
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.element(node)?.rect
    }

    fn client_size(&self, node: NodeId) -> (u32, u32) {
        self.element(node)
            .map(|element| element.client_size)
            .unwrap_or_default()
    }

    fn canvas_data_uri(&self, node: NodeId) -> Result<String, CaptureError> {
        self.element(node)
            .and_then(|element| element.canvas.clone())
            .ok_or_else(|| CaptureError::CanvasTainted(format!("canvas {} not readable", node.0)))
    }

    fn video_frame_data_uri(
        &self,
        node: NodeId,
        _width: u32,
        _height: u32,
    ) -> Result<String, CaptureError> {
        // The frame was already drawn at the element's client size inside the page.
        self.element(node)
            .and_then(|element| element.video_frame.clone())
            .ok_or_else(|| CaptureError::FrameUnavailable(format!("video {}", node.0)))
    }

    fn stylesheet_rules(&self, node: NodeId) -> Result<Vec<String>, CaptureError> {
        self.element(node)
            .and_then(|element| element.sheet_rules.clone())
            .ok_or_else(|| CaptureError::StylesheetAccess(format!("style element {}", node.0)))
    }
}

impl FontFaceSource for SnapshotRender {
    fn font_faces(&self) -> Vec<FontFaceData> {
        self.fonts.clone()
    }
}

/// A rendered page rebuilt on the host side.
#[derive(Clone, Debug)]
pub struct LivePage {
    pub document: Document,
    pub render: SnapshotRender,
}

impl LivePage {
    pub fn from_json(value: serde_json::Value) -> Result<Self, CaptureError> {
        let snapshot: LiveSnapshot = serde_json::from_value(value)
            .map_err(|err| CaptureError::InvalidSnapshot(err.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    pub fn from_snapshot(snapshot: LiveSnapshot) -> Result<Self, CaptureError> {
        let mut render = SnapshotRender {
            elements: HashMap::new(),
            fonts: snapshot.fonts.clone(),
        };
        let document = build_document(snapshot, Some(&mut render))?;
        debug!(
            nodes = document.len(),
            rendered = render.elements.len(),
            "rebuilt live page"
        );
        Ok(Self { document, render })
    }
}

fn build_document(
    snapshot: LiveSnapshot,
    mut render: Option<&mut SnapshotRender>,
) -> Result<Document, CaptureError> {
    let mut doc = Document::new();
    doc.url = snapshot.url;
    doc.referrer = snapshot.referrer;
    let mut ids: Vec<NodeId> = Vec::with_capacity(snapshot.nodes.len());

    for (index, node) in snapshot.nodes.into_iter().enumerate() {
        let parent = match node.parent() {
            Some(parent) => Some(*ids.get(parent).ok_or_else(|| {
                CaptureError::InvalidSnapshot(format!("node {index} precedes its parent {parent}"))
            })?),
            None => None,
        };
        let id = match node {
            LiveNode::ShadowRoot(shadow) => {
                let host = *ids.get(shadow.host).ok_or_else(|| {
                    CaptureError::InvalidSnapshot(format!("shadow root {index} has no host"))
                })?;
                let mode = match shadow.mode.as_str() {
                    "closed" => ShadowRootMode::Closed,
                    _ => ShadowRootMode::Open,
                };
                let id = doc.attach_shadow(host, mode, shadow.delegates_focus)?;
                if let Some(data) = doc.shadow_data_mut(id) {
                    data.adopted_style_sheets = shadow.adopted_style_sheets;
                }
                ids.push(id);
                continue;
            }
            LiveNode::Text(text) => doc.create_text(text.data),
            LiveNode::Comment(comment) => doc.create_comment(comment.data),
            LiveNode::Doctype(doctype) => doc.create_doctype(Doctype {
                name: doctype.name,
                public_id: doctype.public_id,
                system_id: doctype.system_id,
                internal_subset: doctype.internal_subset,
            }),
            LiveNode::Element(element) => {
                create_element(&mut doc, element, render.as_deref_mut())?
            }
        };
        let parent = parent.unwrap_or_else(|| doc.root());
        doc.append_child(parent, id)?;
        ids.push(id);
    }
    Ok(doc)
}

fn create_element(
    doc: &mut Document,
    element: LiveElement,
    render: Option<&mut SnapshotRender>,
) -> Result<NodeId, CaptureError> {
    let id = doc.create_element(&element.local_name, Namespace::from_uri(&element.namespace));
    let import_document = match element.import {
        Some(imported) => Some(Box::new(build_document(*imported, None)?)),
        None => None,
    };
    if let Some(data) = doc.element_mut(id) {
        data.attrs = element
            .attributes
            .into_iter()
            .map(|attr| Attribute {
                name: attr.name,
                value: attr.value,
            })
            .collect();
        data.props.value = element.value;
        data.props.checked = element.checked;
        data.props.selected = element.selected;
        data.props.async_script = element.async_script;
        data.props.current_src = element.current_src;
        data.props.import_document = import_document;
    }
    if let Some(render) = render {
        render.elements.insert(
            id,
            ElementRender {
                style: element.style,
                first_letter: element.first_letter,
                before: element.before,
                after: element.after,
                rect: element.rect,
                client_size: (element.client_width, element.client_height),
                canvas: element.canvas,
                video_frame: element.video_frame,
                sheet_rules: element.sheet_rules,
            },
        );
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "url": "https://example.com/",
            "referrer": "https://search.example/",
            "nodes": [
                { "type": "doctype", "parent": null, "name": "html", "publicId": "", "systemId": "" },
                { "type": "element", "parent": null, "localName": "html",
                  "namespace": "http://www.w3.org/1999/xhtml", "attributes": [] },
                { "type": "element", "parent": 1, "localName": "body",
                  "namespace": "http://www.w3.org/1999/xhtml", "attributes": [],
                  "style": { "display": "block" } },
                { "type": "element", "parent": 2, "localName": "x-card",
                  "namespace": "http://www.w3.org/1999/xhtml", "attributes": [] },
                { "type": "shadowRoot", "parent": null, "host": 3, "mode": "closed",
                  "delegatesFocus": true, "adoptedStyleSheets": [["p { color: red; }"]] },
                { "type": "text", "parent": 4, "data": "inside" },
                { "type": "element", "parent": 2, "localName": "canvas",
                  "namespace": "http://www.w3.org/1999/xhtml",
                  "attributes": [{ "name": "width", "value": "10" }],
                  "canvas": null, "clientWidth": 10, "clientHeight": 5 }
            ],
            "fonts": [{ "family": "Inter", "style": "normal", "weight": "400", "status": "loaded" }]
        })
    }

    #[test]
    fn rebuilds_tree_with_shadow_roots() {
        let page = LivePage::from_json(sample()).unwrap();
        let doc = &page.document;
        assert_eq!(doc.url.as_deref(), Some("https://example.com/"));
        assert_eq!(doc.referrer, "https://search.example/");
        let body = doc.body().unwrap();
        let host = doc.child_elements(body)[0];
        let shadow = doc.shadow_root_of(host).unwrap();
        let data = doc.shadow_data(shadow).unwrap();
        assert_eq!(data.mode, ShadowRootMode::Closed);
        assert!(data.delegates_focus);
        assert_eq!(doc.text_content(shadow), "inside");
        assert_eq!(page.render.font_faces()[0].family, "Inter");
    }

    #[test]
    fn missing_read_backs_are_errors() {
        let page = LivePage::from_json(sample()).unwrap();
        let body = page.document.body().unwrap();
        let canvas = page.document.child_elements(body)[1];
        assert!(matches!(
            page.render.canvas_data_uri(canvas),
            Err(CaptureError::CanvasTainted(_))
        ));
        assert_eq!(page.render.client_size(canvas), (10, 5));
        assert_eq!(
            page.render
                .computed_style(body, None)
                .map(|style| style.property("display").to_string()),
            Some("block".to_string())
        );
    }

    #[test]
    fn rejects_forward_parent_reference() {
        let value = json!({ "nodes": [{ "type": "text", "parent": 3, "data": "x" }] });
        assert!(matches!(
            LivePage::from_json(value),
            Err(CaptureError::InvalidSnapshot(_))
        ));
    }
}
