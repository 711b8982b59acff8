use crate::parser::NodeRef;
use html5ever::{namespace_url, LocalName, QualName};
use kuchikikiki::{Attributes, ElementData, NodeData};
use std::cell::RefCell;

/// Element inspection and editing helpers implemented on [`NodeRef`].
///
/// Used by [`crate::html`] to move content between the `kuchikikiki` DOM and
/// the crate's own [`crate::Document`].
pub trait NodeExt {
    /// Local tag name (`"div"`, `"p"`), or `None` for text, comment and
    /// document nodes.
    fn element_name(&self) -> Option<&str>;

    /// All attributes as `(local name, value)` pairs, in the order the
    /// parser keeps them.  Namespace prefixes are dropped.
    fn attribute_pairs(&self) -> Vec<(String, String)>;

    /// Set an attribute on an element node; does nothing on other nodes.
    fn set_attr_value(&self, name: &str, value: &str);

    /// Serialise the *children* of this node to an HTML string (the node's
    /// own open/close tags are **not** included).
    fn inner_html(&self) -> String;
}

/// Create a new, detached HTML element node with the given tag name and no
/// attributes or children.
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::parser::{new_html_element, NodeExt};
///
/// let div = new_html_element("div");
/// assert_eq!(div.element_name(), Some("div"));
/// ```
pub fn new_html_element(tag_name: &str) -> NodeRef {
    let name = QualName::new(None, html5ever::ns!(html), LocalName::from(tag_name));
    let attributes = Attributes {
        map: Default::default(),
    };
    NodeRef::new(NodeData::Element(ElementData {
        name,
        attributes: RefCell::new(attributes),
        template_contents: None,
    }))
}

impl NodeExt for NodeRef {
    fn element_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.name.local.as_ref())
    }

    fn attribute_pairs(&self) -> Vec<(String, String)> {
        match self.as_element() {
            Some(e) => e
                .attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
                .collect(),
            None => vec![],
        }
    }

    fn set_attr_value(&self, name: &str, value: &str) {
        if let Some(e) = self.as_element() {
            e.attributes.borrow_mut().insert(name, value.to_string());
        }
    }

    fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            out.push_str(&child.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_html;

    #[test]
    fn attribute_pairs_cover_every_attribute() {
        let doc = parse_html(r#"<div id="a" class="navbox x" data-k="v">text</div>"#);
        let div = doc.select_first("div").unwrap().as_node().clone();
        let mut pairs = div.attribute_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("class".to_string(), "navbox x".to_string()),
                ("data-k".to_string(), "v".to_string()),
                ("id".to_string(), "a".to_string()),
            ]
        );
        let text = div.first_child().unwrap();
        assert!(text.attribute_pairs().is_empty());
        assert_eq!(text.element_name(), None);
    }

    #[test]
    fn set_attr_value_on_new_element() {
        let span = new_html_element("span");
        span.set_attr_value("class", "hatnote");
        span.append(NodeRef::new_text("a < b"));
        let wrapper = new_html_element("div");
        wrapper.append(span);
        assert_eq!(
            wrapper.inner_html(),
            r#"<span class="hatnote">a &lt; b</span>"#
        );
    }
}
