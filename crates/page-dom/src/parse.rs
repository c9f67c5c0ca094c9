//! Builds an arena [`Document`] from markup through `scraper`'s html5ever tree.

use scraper::{Html, Node as ScraperNode};
use tracing::debug;

use crate::document::Document;
use crate::node::{Attribute, Doctype, Namespace, NodeId};

/// Parses a full HTML document. Template contents become children of their `<template>`.
pub fn parse_html(markup: &str) -> Document {
    let html = Html::parse_document(markup);
    let mut doc = Document::new();
    let root = doc.root();

    let mut stack: Vec<_> = html
        .tree
        .root()
        .children()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|node| (root, node))
        .collect();

    while let Some((parent, node)) = stack.pop() {
        let created = match node.value() {
            ScraperNode::Doctype(doctype) => Some(doc.create_doctype(Doctype {
                name: doctype.name().to_string(),
                public_id: doctype.public_id().to_string(),
                system_id: doctype.system_id().to_string(),
                internal_subset: String::new(),
            })),
            ScraperNode::Comment(comment) => Some(doc.create_comment((**comment).to_string())),
            ScraperNode::Text(text) => Some(doc.create_text((**text).to_string())),
            ScraperNode::Element(element) => {
                let namespace = Namespace::from_uri(&element.name.ns);
                let id = doc.create_element(element.name(), namespace);
                if let Some(data) = doc.element_mut(id) {
                    data.attrs = element
                        .attrs()
                        .map(|(name, value)| Attribute {
                            name: name.to_string(),
                            value: value.to_string(),
                        })
                        .collect();
                }
                Some(id)
            }
            _ => None,
        };
        let Some(created) = created else {
            continue;
        };
        attach(&mut doc, parent, created);
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (created, child)));
    }

    debug!(nodes = doc.len(), "parsed html document");
    doc
}

fn attach(doc: &mut Document, parent: NodeId, child: NodeId) {
    // A freshly created node can never be an ancestor of its parent.
    if let Err(err) = doc.append_child(parent, child) {
        debug!(%err, "dropping node that could not be attached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structure_and_attributes() {
        let doc = parse_html(
            "<!DOCTYPE html><html><head><title>t</title></head>\
             <body><p class=\"a\">hi</p><svg><foreignObject></foreignObject></svg></body></html>",
        );
        assert_eq!(doc.doctype().map(|d| d.name.as_str()), Some("html"));
        let body = doc.body().unwrap();
        let p = doc.child_elements(body)[0];
        assert_eq!(doc.tag_name(p).as_deref(), Some("P"));
        assert_eq!(doc.attribute(p, "class"), Some("a"));
        assert_eq!(doc.text_content(p), "hi");

        let svg = doc.child_elements(body)[1];
        assert!(doc.element(svg).unwrap().is_svg());
        let foreign = doc.child_elements(svg)[0];
        assert_eq!(doc.tag_name(foreign).as_deref(), Some("foreignObject"));
    }

    #[test]
    fn template_contents_are_children() {
        let doc = parse_html("<template><img src=a.png></template>");
        let template = doc.elements_by_local_name(doc.root(), "template")[0];
        assert_eq!(doc.child_elements(template).len(), 1);
    }

    #[test]
    fn local_name_query_skips_template_contents() {
        let doc = parse_html(
            "<template><style>a{}</style><template><style></style></template></template>\
             <style>b{}</style>",
        );
        let styles = doc.elements_by_local_name(doc.root(), "style");
        assert_eq!(styles.len(), 1);
        assert_eq!(doc.text_content(styles[0]), "b{}");
        assert_eq!(doc.elements_by_local_name(doc.root(), "template").len(), 1);
    }
}
