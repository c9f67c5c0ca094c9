//! Per-element extraction of state that markup alone does not carry.

use page_dom::{serialize_document, Document, ElementData, NodeId};
use tracing::debug;

use crate::context::CaptureContext;
use crate::markers::{Marker, LAZY_LOADED_SRC_ATTRIBUTE};
use crate::model::EMPTY_IMAGE_DATA_URI;
use crate::options::CaptureOptions;
use crate::ports::RenderPort;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Canvas,
    Image,
    Video,
    Iframe,
    Import,
    Input,
    Textarea,
    Select,
    Script,
}

impl ElementKind {
    /// Kind of an HTML element; elements of other namespaces have none.
    pub fn of(element: &ElementData) -> Option<Self> {
        if !element.is_html() {
            return None;
        }
        let kind = match element.local_name.to_ascii_lowercase().as_str() {
            "canvas" => Self::Canvas,
            "img" => Self::Image,
            "video" => Self::Video,
            "iframe" => Self::Iframe,
            "link" => Self::Import,
            "input" => Self::Input,
            "textarea" => Self::Textarea,
            "select" => Self::Select,
            "script" => Self::Script,
            _ => return None,
        };
        Some(kind)
    }

    fn handler(self) -> Handler {
        match self {
            Self::Canvas => collect_canvas,
            Self::Image => collect_image,
            Self::Video => collect_video,
            Self::Iframe => collect_iframe,
            Self::Import => collect_import,
            Self::Input => collect_input,
            Self::Textarea => collect_textarea,
            Self::Select => collect_select,
            Self::Script => collect_script,
        }
    }
}

/// What a handler knows about the element being visited.
pub struct ElementScope<'a> {
    pub node: NodeId,
    pub hidden: bool,
    pub render: &'a dyn RenderPort,
    pub options: &'a CaptureOptions,
}

type Handler = fn(&mut Document, &ElementScope<'_>, &mut CaptureContext);

/// Runs the handler matching the element kind, if any.
pub fn collect_resources(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    let Some(kind) = doc.element(scope.node).and_then(ElementKind::of) else {
        return;
    };
    (kind.handler())(doc, scope, ctx);
}

fn collect_canvas(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    match scope.render.canvas_data_uri(scope.node) {
        Ok(data_uri) => {
            ctx.push_canvas(doc, scope.node, data_uri);
        }
        Err(err) => debug!(node = scope.node.0, %err, "skipping canvas"),
    }
}

fn collect_image(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    let current_src = if scope.hidden {
        EMPTY_IMAGE_DATA_URI.to_string()
    } else {
        doc.attribute(scope.node, LAZY_LOADED_SRC_ATTRIBUTE)
            .filter(|src| scope.options.load_deferred_images && !src.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| doc.current_src(scope.node))
    };
    ctx.push_image(doc, scope.node, current_src);
    doc.remove_attribute(scope.node, LAZY_LOADED_SRC_ATTRIBUTE);
}

fn collect_video(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    if doc.has_attribute(scope.node, "poster") {
        return;
    }
    let (width, height) = scope.render.client_size(scope.node);
    match scope.render.video_frame_data_uri(scope.node, width, height) {
        Ok(data_uri) => {
            ctx.push_poster(doc, scope.node, data_uri);
        }
        Err(err) => debug!(node = scope.node.0, %err, "no poster frame"),
    }
}

fn collect_iframe(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    if scope.hidden && scope.options.remove_hidden_elements {
        ctx.mark(doc, scope.node, Marker::HiddenFrame, "");
    }
}

fn collect_import(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    let content = doc
        .import_document(scope.node)
        .filter(|imported| imported.document_element().is_some())
        .map(serialize_document);
    if let Some(content) = content {
        ctx.push_import(doc, scope.node, content);
    }
}

fn collect_input(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    let input_type = doc.input_type(scope.node);
    if input_type != "password" {
        let value = doc.control_value(scope.node);
        ctx.mark(doc, scope.node, Marker::InputValue, &value);
    }
    if input_type == "radio" || input_type == "checkbox" {
        let checked = doc.is_checked(scope.node);
        ctx.mark(doc, scope.node, Marker::InputValue, if checked { "true" } else { "false" });
    }
}

fn collect_textarea(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    let value = doc.control_value(scope.node);
    ctx.mark(doc, scope.node, Marker::InputValue, &value);
}

fn collect_select(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    for option in doc.elements_by_local_name(scope.node, "option") {
        if doc.is_selected(option) {
            ctx.mark(doc, option, Marker::InputValue, "");
        }
    }
}

fn collect_script(doc: &mut Document, scope: &ElementScope<'_>, ctx: &mut CaptureContext) {
    let declared = matches!(doc.attribute(scope.node, "async"), Some("" | "async"));
    if doc.script_async(scope.node) && !declared {
        ctx.mark(doc, scope.node, Marker::AsyncScript, "");
    }
    if let Some(escaped) = escape_script_end_tags(&doc.text_content(scope.node)) {
        doc.set_text_content(scope.node, &escaped);
    }
}

/// Rewrites every `</script>` (any case) as `<\/script>`; `None` when there is none.
pub fn escape_script_end_tags(text: &str) -> Option<String> {
    const END_TAG: &str = "</script>";
    let lowered = text.to_ascii_lowercase();
    if !lowered.contains(END_TAG) {
        return None;
    }
    let mut out = String::with_capacity(text.len() + 4);
    let mut last = 0;
    for (start, _) in lowered.match_indices(END_TAG) {
        out.push_str(&text[last..start]);
        out.push_str("<\\/script>");
        last = start + END_TAG.len();
    }
    out.push_str(&text[last..]);
    Some(out)
}
