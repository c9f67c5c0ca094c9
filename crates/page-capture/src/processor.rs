//! One capture cycle: prepare the document, walk it, and put it back.

use page_dom::{Document, NodeId};
use tracing::{debug, info};

use crate::context::CaptureContext;
use crate::markers::{
    MarkedElements, Marker, DISABLED_HTTP_EQUIV_ATTRIBUTE, DISABLED_NOSCRIPT_ATTRIBUTE,
};
use crate::model::PageCaptureResult;
use crate::options::CaptureOptions;
use crate::ports::{FontFaceSource, RenderPort, ShadowAccessor};
use crate::stylesheets::extract_stylesheets;
use crate::visibility::is_hidden;
use crate::walker::Walker;

/// Elements that render nothing where they stand; everything else is flow content.
const NON_FLOW_TAGS: [&str; 8] = [
    "base", "link", "meta", "noscript", "script", "style", "template", "title",
];

/// Collaborators of a capture pass.
pub struct CaptureEnv<'a> {
    /// Absent when the document was not rendered (static markup); the walk is skipped.
    pub render: Option<&'a dyn RenderPort>,
    pub shadows: &'a dyn ShadowAccessor,
    pub fonts: &'a dyn FontFaceSource,
}

/// Prepares `doc` for serialization and extracts its runtime state.
///
/// The document is left annotated; [`post_process`] with the returned
/// [`PageCaptureResult::marked_elements`] undoes every change.
pub fn pre_process(
    doc: &mut Document,
    env: &CaptureEnv<'_>,
    options: &CaptureOptions,
) -> PageCaptureResult {
    let mut ctx = CaptureContext::new();
    disable_noscripts(doc);
    disable_meta_refresh(doc);
    hide_head_flow_elements(doc, &mut ctx);
    flatten_foreign_objects(doc);

    let mut stylesheets = Vec::new();
    match (env.render, doc.document_element()) {
        (Some(render), Some(document_element)) => {
            let walker = Walker::new(render, env.shadows, options);
            walker.walk(doc, document_element, &mut ctx, false);
            debug!(
                root = document_element.0,
                marked = ctx.marked.len(),
                "walked rendered tree"
            );
            if options.move_styles_in_head {
                mark_movable_styles(doc, render, &mut ctx);
            }
            stylesheets = extract_stylesheets(doc, render, &mut ctx);
        }
        _ => debug!("no render context, capturing static markup"),
    }

    let used_fonts = ctx.used_fonts();
    info!(
        canvases = ctx.canvases.len(),
        images = ctx.images.len(),
        posters = ctx.posters.len(),
        shadow_roots = ctx.shadow_roots.len(),
        imports = ctx.imports.len(),
        used_fonts = used_fonts.len(),
        "page state captured"
    );
    PageCaptureResult {
        canvases: ctx.canvases,
        fonts: env.fonts.font_faces(),
        stylesheets,
        images: ctx.images,
        posters: ctx.posters,
        used_fonts,
        shadow_roots: ctx.shadow_roots,
        imports: ctx.imports,
        referrer: doc.referrer.clone(),
        marked_elements: ctx.marked,
    }
}

/// Restores what [`pre_process`] changed. Without an undo list the document is scanned for
/// marker attributes instead. Calling it twice is harmless.
pub fn post_process(doc: &mut Document, marked: Option<&MarkedElements>) {
    restore_noscripts(doc);
    restore_meta_refresh(doc);
    match marked {
        Some(marked) => marked.unmark_all(doc),
        None => {
            if let Some(head) = doc.head() {
                for node in head_flow_elements(doc, head) {
                    doc.remove_attribute(node, "hidden");
                }
            }
            MarkedElements::from_document(doc).unmark_all(doc);
        }
    }
}

fn disable_noscripts(doc: &mut Document) {
    for noscript in doc.elements_by_local_name(doc.root(), "noscript") {
        if doc.has_attribute(noscript, DISABLED_NOSCRIPT_ATTRIBUTE) {
            continue;
        }
        let text = doc.text_content(noscript);
        doc.set_attribute(noscript, DISABLED_NOSCRIPT_ATTRIBUTE, text);
        doc.set_text_content(noscript, "");
    }
}

/// Noscripts still in the tree get their text back in place; ones a serializer detached are
/// re-inserted at the start of `<body>`.
fn restore_noscripts(doc: &mut Document) {
    let mut disabled = doc.elements_by_local_name(doc.root(), "noscript");
    disabled.extend(detached_noscripts(doc));
    for noscript in disabled {
        let Some(text) = doc.remove_attribute(noscript, DISABLED_NOSCRIPT_ATTRIBUTE) else {
            continue;
        };
        doc.set_text_content(noscript, &text);
        if doc.is_connected(noscript) {
            continue;
        }
        if let Some(body) = doc.body() {
            let first = doc.first_child(body);
            if let Err(err) = doc.insert_before(body, noscript, first) {
                debug!(%err, "could not restore noscript");
            }
        }
    }
}

fn detached_noscripts(doc: &Document) -> Vec<NodeId> {
    (0..doc.len())
        .map(NodeId)
        .filter(|id| {
            doc.parent(*id).is_none()
                && doc.is_html_element(*id, "noscript")
                && doc.has_attribute(*id, DISABLED_NOSCRIPT_ATTRIBUTE)
        })
        .collect()
}

fn refresh_metas(doc: &Document, attribute: &str) -> Vec<NodeId> {
    doc.elements_by_local_name(doc.root(), "meta")
        .into_iter()
        .filter(|meta| {
            doc.attribute(*meta, attribute)
                .map(|value| value.eq_ignore_ascii_case("refresh"))
                .unwrap_or(false)
        })
        .collect()
}

/// Renames `http-equiv` on refresh metas so the page cannot navigate away mid-capture.
pub fn disable_meta_refresh(doc: &mut Document) {
    for meta in refresh_metas(doc, "http-equiv") {
        doc.rename_attribute(meta, "http-equiv", DISABLED_HTTP_EQUIV_ATTRIBUTE);
    }
}

fn restore_meta_refresh(doc: &mut Document) {
    let metas: Vec<NodeId> = doc
        .elements_by_local_name(doc.root(), "meta")
        .into_iter()
        .filter(|meta| doc.has_attribute(*meta, DISABLED_HTTP_EQUIV_ATTRIBUTE))
        .collect();
    for meta in metas {
        doc.rename_attribute(meta, DISABLED_HTTP_EQUIV_ATTRIBUTE, "http-equiv");
    }
}

fn is_flow_element(doc: &Document, node: NodeId) -> bool {
    doc.element(node)
        .map(|element| {
            !NON_FLOW_TAGS
                .iter()
                .any(|tag| element.local_name.eq_ignore_ascii_case(tag))
        })
        .unwrap_or(false)
}

fn head_flow_elements(doc: &Document, head: NodeId) -> Vec<NodeId> {
    doc.descendant_elements(head)
        .into_iter()
        .filter(|node| is_flow_element(doc, *node))
        .collect()
}

fn hide_head_flow_elements(doc: &mut Document, ctx: &mut CaptureContext) {
    let Some(head) = doc.head() else {
        return;
    };
    for node in head_flow_elements(doc, head) {
        if !doc.has_attribute(node, "hidden") {
            ctx.mark(doc, node, Marker::HeadHidden, "");
        }
    }
}

/// `html > head > *` and `html > body > *` flow elements below `scope`.
fn nested_document_flow(doc: &Document, scope: NodeId) -> Vec<NodeId> {
    let has_local_name = |node: NodeId, name: &str| {
        doc.element(node)
            .map(|element| element.local_name.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    };
    doc.descendant_elements(scope)
        .into_iter()
        .filter(|node| is_flow_element(doc, *node))
        .filter(|node| {
            let Some(section) = doc.parent_element(*node) else {
                return false;
            };
            let in_section = has_local_name(section, "head") || has_local_name(section, "body");
            in_section
                && doc
                    .parent_element(section)
                    .map(|html| has_local_name(html, "html"))
                    .unwrap_or(false)
        })
        .collect()
}

/// Keeps only the flow content of a full document nested in an SVG `foreignObject`.
fn flatten_foreign_objects(doc: &mut Document) {
    let foreign_objects: Vec<NodeId> = doc
        .elements_by_local_name(doc.root(), "foreignObject")
        .into_iter()
        .filter(|node| {
            doc.closest(*node, |doc, ancestor| {
                ancestor != *node
                    && doc
                        .element(ancestor)
                        .map(|element| element.local_name == "svg")
                        .unwrap_or(false)
            })
            .is_some()
        })
        .collect();
    for foreign_object in foreign_objects {
        let flow = nested_document_flow(doc, foreign_object);
        if flow.is_empty() {
            continue;
        }
        doc.remove_children(foreign_object);
        for element in flow {
            doc.detach(element);
            if let Err(err) = doc.append_child(foreign_object, element) {
                debug!(%err, "could not move foreignObject content");
            }
        }
    }
}

/// `body style, body ~ style`: styles inside `<body>` and styles following it.
fn mark_movable_styles(doc: &mut Document, render: &dyn RenderPort, ctx: &mut CaptureContext) {
    let Some(body) = doc.body() else {
        return;
    };
    let mut styles: Vec<NodeId> = doc
        .descendant_elements(body)
        .into_iter()
        .filter(|node| doc.is_html_element(*node, "style"))
        .collect();
    if let Some(parent) = doc.parent(body) {
        styles.extend(
            doc.children(parent)
                .iter()
                .skip_while(|node| **node != body)
                .filter(|node| doc.is_html_element(**node, "style")),
        );
    }
    for style in styles {
        let computed = render.computed_style(style, None);
        if computed.is_some() && is_hidden(computed.as_ref(), || render.bounding_rect(style)) {
            ctx.mark(doc, style, Marker::MovableStyle, "");
        }
    }
}
