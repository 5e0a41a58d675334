//! Arena-backed document tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by `NodeId`.
//! Detached nodes stay in the arena but are unreachable from the root and
//! are skipped by every traversal and by serialization.

use smol_str::SmolStr;

use crate::parse::{self, DomError};

/// Handle to a node in a [`Document`] arena.
///
/// Ids are only meaningful for the document that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    /// Synthetic root; holds the doctype and the top-level element.
    Root { children: Vec<NodeId> },
    Element {
        tag: SmolStr,
        /// Attribute order is preserved so serialization stays stable.
        attrs: Vec<(SmolStr, String)>,
        children: Vec<NodeId>,
    },
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
}

/// An HTML document with query and in-place mutation operations.
///
/// The operations mirror what the editor core needs from a browsing
/// context's DOM: lookup by element id or data attribute, text content
/// replacement, attribute and class manipulation, and inline style
/// property upserts. Nothing here reflows or validates; the document is
/// trusted to be the fixed email-template shape.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
}

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose children are raw text (no entity handling).
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

impl Document {
    /// Parse an HTML string into a document.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        parse::parse_document(html)
    }

    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root {
                    children: Vec::new(),
                },
            }],
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub(crate) fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind });
        match &mut self.nodes[parent.0].kind {
            NodeKind::Root { children } | NodeKind::Element { children, .. } => {
                children.push(id)
            }
            _ => {}
        }
        id
    }

    fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    /// Children of an element (empty for text/comment nodes).
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.kind(node) {
            NodeKind::Root { children } | NodeKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Tag name of an element node, `None` for anything else.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// All element nodes reachable from the root, in document order.
    fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if matches!(self.kind(node), NodeKind::Element { .. }) {
                out.push(node);
            }
            // Reverse so the stack pops in document order.
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Find the first element with the given `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    /// Find the first element where `name="value"`, e.g.
    /// `query_by_attr("data-nonclaim-id", "12274")`.
    pub fn query_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&n| self.attr(n, name) == Some(value))
    }

    /// All elements whose `id` attribute starts with `prefix`.
    pub fn elements_with_id_prefix(&self, prefix: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&n| {
                self.attr(n, "id")
                    .is_some_and(|id| id.starts_with(prefix))
            })
            .collect()
    }

    /// All elements carrying the given class.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    /// First descendant of `node` with the given tag name.
    pub fn first_descendant_with_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            if self.tag(n) == Some(tag) {
                return Some(n);
            }
            for &child in self.children(n).iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    /// The document's `<head>` element.
    pub fn head(&self) -> Option<NodeId> {
        self.first_descendant_with_tag(self.root(), "head")
    }

    /// Attribute value on an element.
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match self.kind(node) {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.as_str() == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Set (or replace) an attribute on an element.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[node.0].kind {
            if let Some(entry) = attrs.iter_mut().find(|(k, _)| k.as_str() == name) {
                entry.1 = value.to_string();
            } else {
                attrs.push((SmolStr::new(name), value.to_string()));
            }
        }
    }

    /// Remove an attribute from an element.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[node.0].kind {
            attrs.retain(|(k, _)| k.as_str() != name);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let merged = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attr(node, "class", &merged);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(existing) = self.attr(node, "class") else {
            return;
        };
        let remaining: Vec<&str> = existing
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect();
        if remaining.is_empty() {
            self.remove_attr(node, "class");
        } else {
            self.set_attr(node, "class", &remaining.join(" "));
        }
    }

    /// Read one property out of the inline `style` attribute.
    pub fn style_property(&self, node: NodeId, name: &str) -> Option<String> {
        let style = self.attr(node, "style")?;
        style.split(';').find_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            (k.trim().eq_ignore_ascii_case(name)).then(|| v.trim().to_string())
        })
    }

    /// Upsert one property in the inline `style` attribute, preserving the
    /// order of existing declarations.
    pub fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) {
        let mut decls: Vec<(String, String)> = self
            .attr(node, "style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|decl| {
                        let (k, v) = decl.split_once(':')?;
                        let k = k.trim();
                        (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if let Some(entry) = decls
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            entry.1 = value.to_string();
        } else {
            decls.push((name.to_string(), value.to_string()));
        }
        let rendered = decls
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr(node, "style", &rendered);
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        if let NodeKind::Text(t) = self.kind(node) {
            out.push_str(t);
        }
        while let Some(n) = stack.pop() {
            if let NodeKind::Text(t) = self.kind(n) {
                out.push_str(t);
            }
            for &child in self.children(n).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Replace all children of `node` with a single text node.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        // Old children stay in the arena, detached.
        if let NodeKind::Element { children, .. } = &mut self.nodes[node.0].kind {
            children.clear();
        }
        self.push_node(node, NodeKind::Text(text.to_string()));
    }

    /// Append a fresh child element, returning its id.
    pub fn append_child_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push_node(
            parent,
            NodeKind::Element {
                tag: SmolStr::new(tag),
                attrs: Vec::new(),
                children: Vec::new(),
            },
        )
    }

    /// Serialize the whole document back to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root()) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            NodeKind::Root { .. } => {}
            NodeKind::Doctype(content) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(content);
                out.push('>');
            }
            NodeKind::Comment(content) => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element { tag, attrs, children } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                if is_raw_text(tag) {
                    for &child in children {
                        if let NodeKind::Text(text) = self.kind(child) {
                            out.push_str(text);
                        }
                    }
                } else {
                    for &child in children {
                        self.write_node(child, out);
                    }
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
