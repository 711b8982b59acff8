//! Arena-backed document tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`].  A parent
//! owns the ordered list of its children's ids, so detaching a subtree is a
//! single update of the parent's child list; the detached nodes stay in the
//! arena, unreachable, until [`Document::compact`] copies out the live tree.

/// Stable handle to a node inside one [`Document`].
///
/// Ids are only meaningful for the document that created them; passing an id
/// from another document panics or addresses an unrelated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tag name and attributes of an element, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new<S: Into<String>>(tag: S) -> ElementData {
        ElementData {
            tag: tag.into(),
            attributes: vec![],
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite an attribute, keeping the position of an existing
    /// one.
    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Anonymous container used as the root of a parsed HTML fragment.
    Fragment,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A tree of elements, text and comments with a fixed root.
///
/// Equality is structural: two documents are equal when their reachable
/// trees match, regardless of detached garbage or arena layout.
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::Document;
///
/// let mut doc = Document::new();
/// let root = doc.root();
/// let table = doc.append_element_with_attrs(root, "table", [("class", "navbox")]);
/// doc.append_text(table, "links");
/// doc.append_element(root, "p");
///
/// doc.detach(table);
/// assert_eq!(doc.children(root).len(), 1);
/// assert!(!doc.is_attached(table));
/// ```
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// An empty document whose root is a [`NodeKind::Fragment`].
    pub fn new() -> Document {
        Document::with_root_kind(NodeKind::Fragment)
    }

    /// An empty document whose root is the given element.
    pub fn with_root(element: ElementData) -> Document {
        Document::with_root_kind(NodeKind::Element(element))
    }

    fn with_root_kind(kind: NodeKind) -> Document {
        Document {
            nodes: vec![Node {
                kind,
                parent: None,
                children: vec![],
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of slots in the arena, detached nodes included.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: vec![],
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_element<S: Into<String>>(&mut self, parent: NodeId, tag: S) -> NodeId {
        self.push(parent, NodeKind::Element(ElementData::new(tag)))
    }

    pub fn append_element_with_attrs<S, I, K, V>(&mut self, parent: NodeId, tag: S, attributes: I) -> NodeId
    where
        S: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut data = ElementData::new(tag);
        for (name, value) in attributes {
            data.set_attr(name, value);
        }
        self.push(parent, NodeKind::Element(data))
    }

    pub fn append_text<S: Into<String>>(&mut self, parent: NodeId, text: S) -> NodeId {
        self.push(parent, NodeKind::Text(text.into()))
    }

    pub fn append_comment<S: Into<String>>(&mut self, parent: NodeId, text: S) -> NodeId {
        self.push(parent, NodeKind::Comment(text.into()))
    }

    /// Unlink `id` (and with it its whole subtree) from its parent.  The
    /// root cannot be detached; calling this on it or on an already
    /// detached node does nothing.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Hand the child list of `parent` to the caller, leaving it empty.
    /// Pair with [`restore_children`][Self::restore_children].
    pub(crate) fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes[parent.0].children)
    }

    pub(crate) fn restore_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        self.nodes[parent.0].children = children;
    }

    /// Clear the parent link of a node that was dropped from a child list
    /// taken with [`take_children`][Self::take_children].
    pub(crate) fn orphan(&mut self, id: NodeId) {
        self.nodes[id.0].parent = None;
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// `id` and everything below it, in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            document: self,
            stack: vec![id],
        }
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_contents(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Copy the reachable tree into a fresh arena, dropping detached nodes.
    pub fn compact(&self) -> Document {
        let mut out = Document::with_root_kind(self.kind(self.root()).clone());
        let mut pending = vec![(self.root(), out.root())];
        while let Some((source, target)) = pending.pop() {
            for &child in self.children(source) {
                let copy = out.push(target, self.kind(child).clone());
                pending.push((child, copy));
            }
        }
        out
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self.root(), other.root())];
        while let Some((left, right)) = pending.pop() {
            if self.kind(left) != other.kind(right) {
                return false;
            }
            let (lc, rc) = (self.children(left), other.children(right));
            if lc.len() != rc.len() {
                return false;
            }
            pending.extend(lc.iter().copied().zip(rc.iter().copied()));
        }
        true
    }
}

impl Eq for Document {}

/// Pre-order iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.document.children(id).iter().rev().copied());
        Some(id)
    }
}
