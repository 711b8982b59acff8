//! Conversion between rendered HTML and [`Document`].
//!
//! Parsing and serialisation are delegated to `kuchikikiki` (html5ever), so
//! tag soup is repaired the way a browser would and text is escaped on the
//! way out.  The `kuchikikiki` DOM is reference counted and never leaves the
//! calling thread; only the arena [`Document`] is handed back.

use crate::document::{Document, NodeId, NodeKind};
use crate::parser::{new_html_element, parse_body_fragment, NodeExt, NodeRef};

/// Parse a rendered page body into a [`Document`] with a fragment root.
///
/// The HTML is parsed in the context of a `<body>` element, so every node
/// of the input ends up in the result at the place it was written, including
/// a leading `<style>`, `<link>` or `<meta>`.  Tags that only make sense at
/// document level (`<html>`, `<head>`, `<body>`) are dropped while their
/// content is kept.  Doctypes and processing instructions are dropped.
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::html::{parse_fragment, serialize};
///
/// let doc = parse_fragment("<p>one</p><p>two</p>");
/// assert_eq!(doc.children(doc.root()).len(), 2);
/// assert_eq!(serialize(&doc), "<p>one</p><p>two</p>");
/// ```
pub fn parse_fragment(html: &str) -> Document {
    let dom = parse_body_fragment(html);
    let mut document = Document::new();
    if let Ok(context) = dom.select_first("html") {
        let root = document.root();
        let mut pending: Vec<(NodeRef, NodeId)> = context
            .as_node()
            .children()
            .map(|child| (child, root))
            .collect();
        pending.reverse();
        while let Some((node, parent)) = pending.pop() {
            if let Some(copy) = copy_node(&node, parent, &mut document) {
                let mark = pending.len();
                pending.extend(node.children().map(|child| (child, copy)));
                pending[mark..].reverse();
            }
        }
    }
    document
}

/// Append a copy of `node` (without children) under `parent`.  Returns the
/// new id for nodes whose children should be copied too.
fn copy_node(node: &NodeRef, parent: NodeId, document: &mut Document) -> Option<NodeId> {
    if let Some(tag) = node.element_name() {
        return Some(document.append_element_with_attrs(parent, tag, node.attribute_pairs()));
    }
    if let Some(text) = node.as_text() {
        document.append_text(parent, text.borrow().clone());
    } else if let Some(comment) = node.as_comment() {
        document.append_comment(parent, comment.borrow().clone());
    }
    None
}

/// Serialise the reachable tree of `document` to HTML.
///
/// A fragment root contributes only its children; an element root is
/// written out with its own tags.
pub fn serialize(document: &Document) -> String {
    let root = document.root();
    let (container, include_root) = match document.kind(root) {
        NodeKind::Element(_) => (build_node(document, root), true),
        _ => (new_html_element("div"), false),
    };

    let mut pending: Vec<(NodeId, NodeRef)> = document
        .children(root)
        .iter()
        .rev()
        .map(|&child| (child, container.clone()))
        .collect();
    while let Some((id, parent)) = pending.pop() {
        let node = build_node(document, id);
        parent.append(node.clone());
        pending.extend(
            document
                .children(id)
                .iter()
                .rev()
                .map(|&child| (child, node.clone())),
        );
    }

    if include_root {
        container.to_string()
    } else {
        container.inner_html()
    }
}

fn build_node(document: &Document, id: NodeId) -> NodeRef {
    match document.kind(id) {
        NodeKind::Element(data) => {
            let node = new_html_element(&data.tag);
            for (name, value) in &data.attributes {
                node.set_attr_value(name, value);
            }
            node
        }
        NodeKind::Text(text) => NodeRef::new_text(text.as_str()),
        NodeKind::Comment(text) => NodeRef::new_comment(text.as_str()),
        NodeKind::Fragment => new_html_element("div"),
    }
}
