//! Depth-first traversal of the rendered tree, shadow roots included.

use page_dom::{inner_html, Document, NodeId};
use tracing::trace;

use crate::collector::{collect_resources, ElementScope};
use crate::context::CaptureContext;
use crate::font::{font_weight, normalize_font_family};
use crate::markers::{Marker, UI_ELEMENT_CLASS};
use crate::model::UsedFont;
use crate::options::CaptureOptions;
use crate::ports::{RenderPort, ShadowAccessor};
use crate::style::{ComputedStyle, PseudoElement};
use crate::visibility::is_hidden;

/// Tags kept in the output even below a hidden ancestor or inside `<head>`.
pub const KEPT_TAG_NAMES: [&str; 11] = [
    "NOSCRIPT",
    "DISABLED-NOSCRIPT",
    "META",
    "LINK",
    "STYLE",
    "TITLE",
    "TEMPLATE",
    "SOURCE",
    "OBJECT",
    "SCRIPT",
    "HEAD",
];

pub struct Walker<'a> {
    render: &'a dyn RenderPort,
    shadows: &'a dyn ShadowAccessor,
    options: &'a CaptureOptions,
}

impl<'a> Walker<'a> {
    pub fn new(
        render: &'a dyn RenderPort,
        shadows: &'a dyn ShadowAccessor,
        options: &'a CaptureOptions,
    ) -> Self {
        Self {
            render,
            shadows,
            options,
        }
    }

    /// Visits the element children of `scope` (an element or a shadow root).
    ///
    /// Side-table indices follow visit order: an element, then its shadow tree, then its
    /// light children.
    pub fn walk(
        &self,
        doc: &mut Document,
        scope: NodeId,
        ctx: &mut CaptureContext,
        ascendant_hidden: bool,
    ) {
        let children: Vec<NodeId> = doc
            .children(scope)
            .iter()
            .copied()
            .filter(|child| {
                doc.element(*child)
                    .map(|element| element.is_html() || element.is_svg())
                    .unwrap_or(false)
            })
            .collect();
        for element in children {
            self.visit(doc, element, ctx, ascendant_hidden);
        }
    }

    fn visit(
        &self,
        doc: &mut Document,
        element: NodeId,
        ctx: &mut CaptureContext,
        ascendant_hidden: bool,
    ) {
        let options = self.options;
        let (is_html, is_svg, is_template) = match doc.element(element) {
            Some(data) => (data.is_html(), data.is_svg(), data.is("template")),
            None => return,
        };
        let mut hidden = false;
        let mut kept = false;

        if options.samples_style() {
            let style = self.render.computed_style(element, None);
            if is_html && options.remove_hidden_elements {
                kept = is_kept(doc, element, ascendant_hidden);
                if !kept {
                    hidden = ascendant_hidden
                        || is_hidden(style.as_ref(), || self.render.bounding_rect(element));
                    if hidden {
                        ctx.mark(doc, element, Marker::HiddenContent, "");
                    }
                }
            }
            if !hidden {
                if options.compress_html {
                    let preserves_space = style
                        .as_ref()
                        .map(|style| style.property("white-space").starts_with("pre"))
                        .unwrap_or(false);
                    if preserves_space {
                        ctx.mark(doc, element, Marker::PreservedSpace, "");
                    }
                }
                if options.remove_unused_fonts {
                    self.sample_fonts(style.as_ref(), ctx);
                    for pseudo in PseudoElement::FONT_SAMPLED {
                        let pseudo_style = self.render.computed_style(element, Some(pseudo));
                        self.sample_fonts(pseudo_style.as_ref(), ctx);
                    }
                }
            }
        }

        let scope = ElementScope {
            node: element,
            hidden,
            render: self.render,
            options,
        };
        collect_resources(doc, &scope, ctx);

        if !is_svg {
            if let Some(shadow) = self.shadows.shadow_root(doc, element) {
                let overlay = doc
                    .element(element)
                    .map(|data| data.has_class(UI_ELEMENT_CLASS))
                    .unwrap_or(false);
                if !overlay {
                    self.capture_shadow_root(doc, element, shadow, ctx, hidden);
                }
            }
        }

        if !is_template {
            self.walk(doc, element, ctx, hidden);
        }

        if !options.auto_save_external_save && options.remove_hidden_elements && ascendant_hidden
        {
            let kept_below = doc.attribute(element, Marker::KeptContent.attribute()) == Some("");
            if kept || kept_below {
                if let Some(parent) = doc.parent_element(element) {
                    ctx.mark(doc, parent, Marker::KeptContent, "");
                }
            } else if hidden {
                ctx.mark(doc, element, Marker::RemovedContent, "");
            }
        }
    }

    fn capture_shadow_root(
        &self,
        doc: &mut Document,
        host: NodeId,
        shadow: NodeId,
        ctx: &mut CaptureContext,
        hidden: bool,
    ) {
        let index = ctx.push_shadow_root(doc, host);
        trace!(host = host.0, index, "walking shadow root");
        self.walk(doc, shadow, ctx, hidden);

        let content = inner_html(doc, shadow);
        let (delegates_focus, mode, adopted) = match doc.shadow_data(shadow) {
            Some(data) => (
                data.delegates_focus,
                data.mode.as_str().to_string(),
                data.adopted_style_sheets
                    .iter()
                    .map(|rules| rules.join("\n"))
                    .collect::<Vec<_>>(),
            ),
            None => (false, String::from("open"), Vec::new()),
        };
        if let Some(info) = ctx.shadow_root_mut(index) {
            info.content = content;
            info.delegates_focus = delegates_focus;
            info.mode = mode;
            info.adopted_style_sheets = (!adopted.is_empty()).then_some(adopted);
        }
    }

    fn sample_fonts(&self, style: Option<&ComputedStyle>, ctx: &mut CaptureContext) {
        let Some(style) = style else {
            return;
        };
        let font_style = non_empty_or_normal(style.property("font-style"));
        for family in style.property("font-family").split(',') {
            let family = normalize_font_family(family);
            if !self.options.allows_font(&family, &font_style) {
                continue;
            }
            ctx.add_used_font(UsedFont(
                family,
                font_weight(style.property("font-weight")),
                font_style.clone(),
                non_empty_or_normal(style.property("font-variant")),
            ));
        }
    }
}

/// Kept elements survive hidden-subtree removal: always-kept tags below a hidden ancestor
/// or inside `<head>`, and anything inside a `<details>`.
fn is_kept(doc: &Document, element: NodeId, ascendant_hidden: bool) -> bool {
    let tag_kept = (ascendant_hidden || doc.is_in_document_head(element))
        && doc
            .tag_name(element)
            .map(|tag| KEPT_TAG_NAMES.contains(&tag.as_str()))
            .unwrap_or(false);
    tag_kept || doc.closest(element, |doc, node| doc.is_html_element(node, "details")).is_some()
}

fn non_empty_or_normal(value: &str) -> String {
    if value.is_empty() {
        "normal".to_string()
    } else {
        value.to_string()
    }
}
