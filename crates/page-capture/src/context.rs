use std::collections::BTreeMap;

use page_dom::{Document, NodeId};

use crate::markers::{MarkedElements, Marker};
use crate::model::{CanvasData, ImageData, ImportData, ShadowRootInfo, UsedFont};

/// Accumulator owned by one in-flight capture.
///
/// Every `push_*` stores the side-table entry and marks its element with the entry index in
/// the same call, so the two can never drift apart.
#[derive(Debug, Default)]
pub struct CaptureContext {
    pub canvases: Vec<CanvasData>,
    pub images: Vec<ImageData>,
    pub posters: Vec<String>,
    pub shadow_roots: Vec<ShadowRootInfo>,
    pub imports: Vec<ImportData>,
    used_fonts: BTreeMap<String, UsedFont>,
    pub marked: MarkedElements,
}

impl CaptureContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, doc: &mut Document, node: NodeId, marker: Marker, value: &str) {
        self.marked.mark(doc, node, marker, value);
    }

    pub fn push_canvas(&mut self, doc: &mut Document, node: NodeId, data_uri: String) -> usize {
        self.canvases.push(CanvasData { data_uri });
        self.mark_index(doc, node, Marker::Canvas, self.canvases.len() - 1)
    }

    pub fn push_image(&mut self, doc: &mut Document, node: NodeId, current_src: String) -> usize {
        self.images.push(ImageData { current_src });
        self.mark_index(doc, node, Marker::Image, self.images.len() - 1)
    }

    pub fn push_poster(&mut self, doc: &mut Document, node: NodeId, data_uri: String) -> usize {
        self.posters.push(data_uri);
        self.mark_index(doc, node, Marker::Poster, self.posters.len() - 1)
    }

    pub fn push_import(&mut self, doc: &mut Document, node: NodeId, content: String) -> usize {
        self.imports.push(ImportData { content });
        self.mark_index(doc, node, Marker::Import, self.imports.len() - 1)
    }

    /// Reserves the shadow-root entry of `host` before its tree is walked, so nested hosts
    /// get later indices. Fill it with [`CaptureContext::shadow_root_mut`].
    pub fn push_shadow_root(&mut self, doc: &mut Document, host: NodeId) -> usize {
        self.shadow_roots.push(ShadowRootInfo::default());
        self.mark_index(doc, host, Marker::ShadowRoot, self.shadow_roots.len() - 1)
    }

    pub fn shadow_root_mut(&mut self, index: usize) -> Option<&mut ShadowRootInfo> {
        self.shadow_roots.get_mut(index)
    }

    pub fn add_used_font(&mut self, font: UsedFont) {
        self.used_fonts.insert(font.key(), font);
    }

    pub fn used_fonts(&self) -> Vec<UsedFont> {
        self.used_fonts.values().cloned().collect()
    }

    fn mark_index(&mut self, doc: &mut Document, node: NodeId, marker: Marker, index: usize) -> usize {
        self.marked.mark(doc, node, marker, &index.to_string());
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_marks_with_entry_index() {
        let mut doc = Document::new();
        let root = doc.root();
        let first = doc.create_html_element("img");
        let second = doc.create_html_element("img");
        doc.append_child(root, first).unwrap();
        doc.append_child(root, second).unwrap();

        let mut ctx = CaptureContext::new();
        assert_eq!(ctx.push_image(&mut doc, first, "a.png".into()), 0);
        assert_eq!(ctx.push_image(&mut doc, second, "b.png".into()), 1);
        assert_eq!(doc.attribute(second, Marker::Image.attribute()), Some("1"));
        assert_eq!(ctx.images[1].current_src, "b.png");
        assert!(ctx.marked.contains(first, Marker::Image));
    }

    #[test]
    fn used_fonts_are_deduplicated() {
        let mut ctx = CaptureContext::new();
        let font = UsedFont("arial".into(), "400".into(), "normal".into(), "normal".into());
        ctx.add_used_font(font.clone());
        ctx.add_used_font(font);
        assert_eq!(ctx.used_fonts().len(), 1);
    }
}
