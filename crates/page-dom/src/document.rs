use tracing::trace;

use crate::errors::DomError;
use crate::node::{
    Attribute, Doctype, ElementData, Namespace, Node, NodeData, NodeId, ShadowRootData,
    ShadowRootMode,
};

/// A document tree held in an arena, together with the live state a rendered page exposes
/// through DOM properties (form values, `currentSrc`, attached shadow roots).
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    pub url: Option<String>,
    pub referrer: String,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
            url: None,
            referrer: String::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, local_name: &str, namespace: Namespace) -> NodeId {
        self.push(NodeData::Element(ElementData::new(local_name, namespace)))
    }

    pub fn create_html_element(&mut self, local_name: &str) -> NodeId {
        self.create_element(&local_name.to_ascii_lowercase(), Namespace::Html)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, doctype: Doctype) -> NodeId {
        self.push(NodeData::Doctype(doctype))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.node_mut(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// True when `id` is an HTML element with the given local name.
    pub fn is_html_element(&self, id: NodeId, local_name: &str) -> bool {
        self.element(id)
            .map(|element| element.is(local_name))
            .unwrap_or(false)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.element(id).map(ElementData::tag_name)
    }

    pub fn doctype(&self) -> Option<&Doctype> {
        self.node(self.root)
            .children
            .iter()
            .find_map(|child| match &self.node(*child).data {
                NodeData::Doctype(doctype) => Some(doctype),
                _ => None,
            })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Inclusive ancestor test that stays inside one tree (it does not cross shadow hosts).
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if self.contains(child, parent) {
            return Err(DomError::Hierarchy(format!(
                "node {} is an inclusive ancestor of {}",
                child.0, parent.0
            )));
        }
        if reference == Some(child) {
            return Ok(());
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotFound(format!(
                    "reference node {} is not a child of {}",
                    reference.0, parent.0
                )));
            }
        }
        self.detach(child);
        let index = match reference {
            Some(reference) => self
                .node(parent)
                .children
                .iter()
                .position(|id| *id == reference)
                .ok_or_else(|| DomError::NotFound(format!("reference node {}", reference.0)))?,
            None => self.node(parent).children.len(),
        };
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Removes `id` from its parent. The node and its subtree stay in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != id);
        }
    }

    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
    }

    /// Attached to the document, possibly through one or more shadow hosts.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match (&self.node(current).data, self.parent(current)) {
                (_, Some(parent)) => current = parent,
                (NodeData::ShadowRoot(shadow), None) => current = shadow.host,
                _ => return false,
            }
        }
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|child| self.is_html_element(*child, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|child| self.is_html_element(*child, "body"))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id)
            .map(|element| element.has_attribute(name))
            .unwrap_or(false)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let Some(element) = self.element_mut(id) else {
            return;
        };
        match element.attrs.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => element.attrs.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Returns the removed value. Removing an absent attribute is a no-op.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let element = self.element_mut(id)?;
        let index = element.attrs.iter().position(|attr| attr.name == name)?;
        Some(element.attrs.remove(index).value)
    }

    /// Renames an attribute in place, keeping its position and value.
    pub fn rename_attribute(&mut self, id: NodeId, from: &str, to: &str) -> bool {
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        if element.has_attribute(to) {
            return false;
        }
        match element.attrs.iter_mut().find(|attr| attr.name == from) {
            Some(attr) => {
                attr.name = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match &self.node(id).data {
            NodeData::Text(text) | NodeData::Comment(text) => text.clone(),
            NodeData::Doctype(_) | NodeData::Document => String::new(),
            _ => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            match &self.node(*child).data {
                NodeData::Text(text) => out.push_str(text),
                NodeData::Element(_) => self.collect_text(*child, out),
                _ => {}
            }
        }
    }

    /// Replaces every child with a single text node (or nothing for an empty string).
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(current) | NodeData::Comment(current) = &mut self.node_mut(id).data
        {
            *current = text.to_string();
            return;
        }
        self.remove_children(id);
        if !text.is_empty() {
            let text = self.create_text(text);
            self.node_mut(text).parent = Some(id);
            self.node_mut(id).children.push(text);
        }
    }

    /// Pre-order descendants of `scope` (exclusive), staying inside the tree of `scope`.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, scope: NodeId) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.is_element(*id))
            .collect()
    }

    /// Descendant elements of any namespace whose local name matches (`querySelectorAll(name)`).
    /// Template contents are a separate fragment and are not searched.
    pub fn elements_by_local_name(&self, scope: NodeId, local_name: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(element) = self.element(id) else {
                continue;
            };
            if element.local_name.eq_ignore_ascii_case(local_name) {
                out.push(id);
            }
            if !self.is_html_element(id, "template") {
                stack.extend(self.children(id).iter().rev().copied());
            }
        }
        out
    }

    /// Nearest inclusive ancestor element matching `predicate`, like `Element.closest`.
    pub fn closest<F>(&self, id: NodeId, mut predicate: F) -> Option<NodeId>
    where
        F: FnMut(&Document, NodeId) -> bool,
    {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node) && predicate(self, node) {
                return Some(node);
            }
            current = self.parent_element(node);
        }
        None
    }

    /// True for `html > head` itself and anything under it.
    pub fn is_in_document_head(&self, id: NodeId) -> bool {
        self.closest(id, |doc, node| {
            doc.is_html_element(node, "head")
                && doc
                    .parent(node)
                    .map(|parent| doc.is_html_element(parent, "html"))
                    .unwrap_or(false)
        })
        .is_some()
    }

    pub fn attach_shadow(
        &mut self,
        host: NodeId,
        mode: ShadowRootMode,
        delegates_focus: bool,
    ) -> Result<NodeId, DomError> {
        match self.element(host) {
            None => return Err(DomError::NotAnElement(host.0)),
            Some(element) if element.shadow_root.is_some() => {
                return Err(DomError::Hierarchy(format!(
                    "element {} already hosts a shadow root",
                    host.0
                )))
            }
            Some(_) => {}
        }
        let shadow = self.push(NodeData::ShadowRoot(ShadowRootData {
            host,
            mode,
            delegates_focus,
            adopted_style_sheets: Vec::new(),
        }));
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(shadow);
        }
        trace!(host = host.0, shadow = shadow.0, "attached shadow root");
        Ok(shadow)
    }

    pub fn shadow_root_of(&self, host: NodeId) -> Option<NodeId> {
        self.element(host)?.shadow_root
    }

    pub fn shadow_data(&self, id: NodeId) -> Option<&ShadowRootData> {
        match &self.node(id).data {
            NodeData::ShadowRoot(shadow) => Some(shadow),
            _ => None,
        }
    }

    pub fn shadow_data_mut(&mut self, id: NodeId) -> Option<&mut ShadowRootData> {
        match &mut self.node_mut(id).data {
            NodeData::ShadowRoot(shadow) => Some(shadow),
            _ => None,
        }
    }

    /// Lower-cased `type` of an input element, `text` when missing.
    pub fn input_type(&self, id: NodeId) -> String {
        self.attribute(id, "type")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "text".to_string())
    }

    /// The `value` property of an input or textarea.
    pub fn control_value(&self, id: NodeId) -> String {
        let Some(element) = self.element(id) else {
            return String::new();
        };
        if let Some(value) = &element.props.value {
            return value.clone();
        }
        if element.is("textarea") {
            return self.text_content(id);
        }
        element.attribute("value").unwrap_or_default().to_string()
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.element(id)
            .map(|element| {
                element
                    .props
                    .checked
                    .unwrap_or_else(|| element.has_attribute("checked"))
            })
            .unwrap_or(false)
    }

    /// Selectedness of an `option`, including the implicit first option of a single select.
    pub fn is_selected(&self, option: NodeId) -> bool {
        let Some(element) = self.element(option) else {
            return false;
        };
        if let Some(selected) = element.props.selected {
            return selected;
        }
        if element.has_attribute("selected") {
            return true;
        }
        let Some(select) = self.closest(option, |doc, node| doc.is_html_element(node, "select"))
        else {
            return false;
        };
        let multiple = self.has_attribute(select, "multiple");
        let display_size = self
            .attribute(select, "size")
            .and_then(|size| size.trim().parse::<u32>().ok())
            .unwrap_or(1);
        if multiple || display_size > 1 {
            return false;
        }
        let options: Vec<NodeId> = self
            .descendant_elements(select)
            .into_iter()
            .filter(|id| self.is_html_element(*id, "option"))
            .collect();
        let explicit = options.iter().any(|id| {
            self.element(*id)
                .map(|element| {
                    element.props.selected == Some(true)
                        || (element.props.selected.is_none() && element.has_attribute("selected"))
                })
                .unwrap_or(false)
        });
        if explicit {
            return false;
        }
        options
            .into_iter()
            .find(|id| !self.has_attribute(*id, "disabled"))
            == Some(option)
    }

    /// The `async` property of a script element.
    pub fn script_async(&self, id: NodeId) -> bool {
        self.element(id)
            .map(|element| {
                element
                    .props
                    .async_script
                    .unwrap_or_else(|| element.has_attribute("async"))
            })
            .unwrap_or(false)
    }

    /// `currentSrc` of an image, falling back to its `src` attribute.
    pub fn current_src(&self, id: NodeId) -> String {
        self.element(id)
            .map(|element| {
                element
                    .props
                    .current_src
                    .clone()
                    .unwrap_or_else(|| element.attribute("src").unwrap_or_default().to_string())
            })
            .unwrap_or_default()
    }

    pub fn import_document(&self, id: NodeId) -> Option<&Document> {
        self.element(id)?.props.import_document.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skeleton() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let html = doc.create_html_element("html");
        let head = doc.create_html_element("head");
        let body = doc.create_html_element("body");
        let root = doc.root();
        doc.append_child(root, html).unwrap();
        doc.append_child(html, head).unwrap();
        doc.append_child(html, body).unwrap();
        (doc, html, head, body)
    }

    #[test]
    fn finds_document_sections() {
        let (doc, html, head, body) = skeleton();
        assert_eq!(doc.document_element(), Some(html));
        assert_eq!(doc.head(), Some(head));
        assert_eq!(doc.body(), Some(body));
        assert!(doc.is_in_document_head(head));
        assert!(!doc.is_in_document_head(body));
    }

    #[test]
    fn insert_before_moves_existing_node() {
        let (mut doc, _, _, body) = skeleton();
        let first = doc.create_html_element("p");
        let second = doc.create_html_element("div");
        doc.append_child(body, first).unwrap();
        doc.append_child(body, second).unwrap();
        doc.insert_before(body, second, Some(first)).unwrap();
        assert_eq!(doc.children(body), &[second, first]);
    }

    #[test]
    fn rejects_cycles() {
        let (mut doc, html, _, body) = skeleton();
        let err = doc.append_child(body, html).unwrap_err();
        assert!(matches!(err, DomError::Hierarchy(_)));
    }

    #[test]
    fn rename_attribute_keeps_position() {
        let (mut doc, _, head, _) = skeleton();
        let meta = doc.create_html_element("meta");
        doc.append_child(head, meta).unwrap();
        doc.set_attribute(meta, "http-equiv", "refresh");
        doc.set_attribute(meta, "content", "5");
        assert!(doc.rename_attribute(meta, "http-equiv", "disabled-http-equiv"));
        let names: Vec<&str> = doc
            .element(meta)
            .unwrap()
            .attrs
            .iter()
            .map(|attr| attr.name.as_str())
            .collect();
        assert_eq!(names, vec!["disabled-http-equiv", "content"]);
    }

    #[test]
    fn implicit_first_option_is_selected() {
        let (mut doc, _, _, body) = skeleton();
        let select = doc.create_html_element("select");
        let a = doc.create_html_element("option");
        let b = doc.create_html_element("option");
        doc.append_child(body, select).unwrap();
        doc.append_child(select, a).unwrap();
        doc.append_child(select, b).unwrap();
        assert!(doc.is_selected(a));
        assert!(!doc.is_selected(b));

        doc.set_attribute(b, "selected", "");
        assert!(!doc.is_selected(a));
        assert!(doc.is_selected(b));
    }

    #[test]
    fn shadow_content_is_connected_through_host() {
        let (mut doc, _, _, body) = skeleton();
        let host = doc.create_html_element("div");
        doc.append_child(body, host).unwrap();
        let shadow = doc.attach_shadow(host, ShadowRootMode::Closed, false).unwrap();
        let inner = doc.create_html_element("span");
        doc.append_child(shadow, inner).unwrap();
        assert!(doc.is_connected(inner));
        doc.detach(host);
        assert!(!doc.is_connected(inner));
    }
}
