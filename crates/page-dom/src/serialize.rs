//! HTML serialization following the fragment serialization algorithm.

use crate::document::Document;
use crate::node::{Namespace, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_PARENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serializes the children of `id`. For a shadow root this is its `innerHTML`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_children(doc, id, &mut out);
    out
}

/// Whole document, every top-level node included.
pub fn document_html(doc: &Document) -> String {
    inner_html(doc, doc.root())
}

/// Doctype declaration (with public/system identifiers and internal subset) followed by a
/// space and the document element's outer HTML. Empty when there is no document element.
pub fn serialize_document(doc: &Document) -> String {
    let mut out = String::new();
    if let Some(doctype) = doc.doctype() {
        out.push_str("<!DOCTYPE ");
        out.push_str(&doctype.name);
        if !doctype.public_id.is_empty() {
            out.push_str(" PUBLIC \"");
            out.push_str(&doctype.public_id);
            out.push('"');
            if !doctype.system_id.is_empty() {
                out.push_str(" \"");
                out.push_str(&doctype.system_id);
                out.push('"');
            }
        } else if !doctype.system_id.is_empty() {
            out.push_str(" SYSTEM \"");
            out.push_str(&doctype.system_id);
            out.push('"');
        }
        if !doctype.internal_subset.is_empty() {
            out.push_str(" [");
            out.push_str(&doctype.internal_subset);
            out.push(']');
        }
        out.push_str("> ");
    }
    if let Some(html) = doc.document_element() {
        write_node(doc, html, &mut out);
    }
    out
}

fn write_children(doc: &Document, id: NodeId, out: &mut String) {
    for child in doc.children(id) {
        write_node(doc, *child, out);
    }
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        NodeData::Document | NodeData::ShadowRoot(_) => write_children(doc, id, out),
        NodeData::Doctype(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(&doctype.name);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) => {
            if parent_is_raw_text(doc, id) {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Element(element) => {
            let name = element.local_name.as_str();
            out.push('<');
            out.push_str(name);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attribute(&attr.value, out);
                out.push('"');
            }
            out.push('>');
            if element.namespace == Namespace::Html && VOID_ELEMENTS.contains(&name) {
                return;
            }
            write_children(doc, id, out);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn parent_is_raw_text(doc: &Document, id: NodeId) -> bool {
    doc.parent(id)
        .and_then(|parent| doc.element(parent))
        .map(|element| {
            element.is_html() && RAW_TEXT_PARENTS.contains(&element.local_name.as_str())
        })
        .unwrap_or(false)
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Doctype;
    use crate::parse::parse_html;

    #[test]
    fn serializes_void_and_raw_text() {
        let doc = parse_html(
            "<html><head><script>if (a < b) {}</script></head>\
             <body><p title='a \"b\"'>x &amp; y<br></p></body></html>",
        );
        let html = outer_html(&doc, doc.document_element().unwrap());
        assert_eq!(
            html,
            "<html><head><script>if (a < b) {}</script></head>\
             <body><p title=\"a &quot;b&quot;\">x &amp; y<br></p></body></html>"
        );
    }

    #[test]
    fn serialize_document_writes_public_doctype() {
        let mut doc = Document::new();
        let root = doc.root();
        let doctype = doc.create_doctype(Doctype {
            name: "html".into(),
            public_id: "-//W3C//DTD HTML 4.01//EN".into(),
            system_id: "http://www.w3.org/TR/html4/strict.dtd".into(),
            internal_subset: String::new(),
        });
        let html = doc.create_html_element("html");
        doc.append_child(root, doctype).unwrap();
        doc.append_child(root, html).unwrap();
        assert_eq!(
            serialize_document(&doc),
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \
             \"http://www.w3.org/TR/html4/strict.dtd\"> <html></html>"
        );
    }
}
