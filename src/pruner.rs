use crate::document::{Document, NodeId};
use crate::rules::RuleSet;
use serde::Serialize;
use tracing::{trace, warn};

/// Why an element was pruned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// The first class token found in the excluded-class set.
    Class(String),
    Id(String),
}

/// What a [`prune_tree`] pass removed.  Each removed subtree is counted
/// once, at its top element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneStats {
    pub removed_by_class: usize,
    pub removed_by_id: usize,
    /// The root carried an excluded class or id and was kept anyway.
    pub root_matched: bool,
}

impl PruneStats {
    pub fn removed(&self) -> usize {
        self.removed_by_class + self.removed_by_id
    }

    fn record(&mut self, reason: &RemovalReason) {
        match reason {
            RemovalReason::Class(_) => self.removed_by_class += 1,
            RemovalReason::Id(_) => self.removed_by_id += 1,
        }
    }
}

/// Return why `id` should be pruned, or `None` to keep it.  Only elements
/// are ever candidates; classes are checked before the id.
pub fn removal_reason(document: &Document, id: NodeId, rules: &RuleSet) -> Option<RemovalReason> {
    let element = document.element(id)?;
    if let Some(class) = element.class_tokens().find(|c| rules.is_excluded_class(c)) {
        return Some(RemovalReason::Class(class.to_string()));
    }
    element
        .id()
        .filter(|id| rules.is_excluded_id(id))
        .map(|id| RemovalReason::Id(id.to_string()))
}

/// Remove every element whose class or id is excluded, together with its
/// subtree.
///
/// The walk is depth first and visits a parent before its children, so a
/// removed element's descendants are dropped as a unit without being looked
/// at.  Siblings of a removed element are unaffected.  The root is never
/// removed: if it matches, a warning is logged and
/// [`PruneStats::root_matched`] is set.
///
/// Removed nodes are only unlinked; call [`Document::compact`] (or use
/// [`pruned`]) to reclaim them.
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::{prune_tree, Document, RuleSetBuilder};
///
/// let rules = RuleSetBuilder::new().exclude_class("navbox").build().unwrap();
/// let mut doc = Document::new();
/// let root = doc.root();
/// doc.append_element_with_attrs(root, "table", [("class", "navbox collapsible")]);
/// let p = doc.append_element(root, "p");
///
/// let stats = prune_tree(&mut doc, &rules);
/// assert_eq!(stats.removed(), 1);
/// assert_eq!(doc.children(root), &[p]);
/// ```
pub fn prune_tree(document: &mut Document, rules: &RuleSet) -> PruneStats {
    let mut stats = PruneStats::default();
    if rules.prunes_nothing() {
        return stats;
    }

    let root = document.root();
    if let Some(reason) = removal_reason(document, root, rules) {
        warn!(?reason, "document root matches an exclusion rule, keeping it");
        stats.root_matched = true;
    }

    let mut pending = vec![root];
    while let Some(parent) = pending.pop() {
        let children = document.take_children(parent);
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match removal_reason(document, child, rules) {
                Some(reason) => {
                    trace!(node = child.index(), ?reason, "pruning subtree");
                    stats.record(&reason);
                    document.orphan(child);
                }
                None => kept.push(child),
            }
        }
        // reversed so the first child is walked first
        pending.extend(
            kept.iter()
                .rev()
                .copied()
                .filter(|c| !document.children(*c).is_empty()),
        );
        document.restore_children(parent, kept);
    }

    stats
}

/// Owned variant of [`prune_tree`] that also compacts the arena.
pub fn pruned(mut document: Document, rules: &RuleSet) -> Document {
    prune_tree(&mut document, rules);
    document.compact()
}
