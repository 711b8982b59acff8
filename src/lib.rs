//! Page, element and text filters for turning rendered wiki pages into an
//! offline reader corpus.
//!
//! A filter file (see `filters.yaml` at the crate root) lists pages and
//! templates to skip, HTML classes and ids whose elements are stripped, and
//! ordered regex rewrites for the final HTML.  This crate loads that file
//! into an immutable [`RuleSet`] and applies it.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use wikifilter_rs::{filter_page, RuleSet};
//!
//! let rules = Arc::new(RuleSet::from_yaml_str(r#"
//! EXCLUDE_PAGES: ["Template:Navbox"]
//! EXCLUDE_CLASSES: [navbox]
//! TEXT_REPLACE:
//!   - re: '\s*\(listen\)'
//! "#).unwrap());
//!
//! let outcome = filter_page(
//!     "Paris",
//!     r#"<p>Paris (listen)</p><table class="navbox"><tr><td>x</td></tr></table>"#,
//!     rules.clone(),
//! );
//! assert_eq!(outcome.content(), Some("<p>Paris</p>"));
//!
//! assert!(filter_page("Template:Navbox", "<p>...</p>", rules).is_excluded());
//! ```
//!
//! ## Module layout
//!
//! * [`RuleSet`] / [`RuleSetBuilder`] – loading and validating rules;
//!   failures are [`ConfigError`]s.
//! * [`should_exclude_page`] – the per-page title check.
//! * [`Document`] and [`prune_tree`] – the arena tree and the element pruner.
//! * [`apply_substitutions`] – the ordered `TEXT_REPLACE` pass.
//! * [`html`] – parsing rendered HTML into a [`Document`] and back.
//! * [`PageFilter`] – all stages for one page or a parallel batch.
//! * [`parser`] – thin wrappers around the underlying HTML parser.

macro_rules! d {
    ($code:block) => {
        if cfg!(debug_assertions) {
            $code
        }
    };
}

#[macro_use]
mod logging;

mod document;
mod error;
mod exclusion;
pub mod html;
mod models;
mod node_utils;
mod pipeline;
mod pruner;
mod rules;
mod substitution;

use std::sync::Arc;

pub use document::{Descendants, Document, ElementData, NodeId, NodeKind};
pub use error::ConfigError;
pub use exclusion::{normalize_title, should_exclude_page};
pub use logging::logger::{DebugLogsCategories, Listener, PerfListener};
pub use logging::PerfTracingListener;
pub use models::{FilterOptions, Page, PageOutcome};
pub use pipeline::PageFilter;
pub use pruner::{prune_tree, pruned, removal_reason, PruneStats, RemovalReason};
pub use rules::{RuleSet, RuleSetBuilder, RuleSummary, SubstitutionRule, BUILTIN_FILTERS};
pub use substitution::apply_substitutions;

/// Thin wrappers around the underlying HTML parser.
///
/// [`NodeRef`] is the reference-counted DOM node type produced by
/// `kuchikikiki`.  [`parse_html`] parses a complete HTML document into a
/// [`NodeRef`] tree; [`parse_body_fragment`] parses markup as the content of
/// a `<body>` element.
pub mod parser {
    use html5ever::{namespace_url, LocalName, QualName};
    use kuchikikiki::traits::TendrilSink;
    pub use kuchikikiki::NodeRef;
    pub use crate::node_utils::{new_html_element, NodeExt};

    /// Parse an HTML string into a [`NodeRef`] document tree.
    ///
    /// The parser follows the HTML5 parsing rules; an implicit `<html>`, `<head>`,
    /// and `<body>` are synthesised when missing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wikifilter_rs::parser::parse_html;
    ///
    /// let doc = parse_html("<div><p>hello</p></div>");
    /// assert!(doc.select_first("p").is_ok());
    /// ```
    pub fn parse_html(html: &str) -> NodeRef {
        kuchikikiki::parse_html().one(html)
    }

    /// Parse an HTML string the way a browser parses `innerHTML` assigned to
    /// a `<body>` element.
    ///
    /// Nothing is moved into a `<head>`: `<style>`, `<link>`, `<meta>` and
    /// `<script>` stay where they appear.  The returned document has a
    /// single `<html>` element whose children are the parsed nodes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wikifilter_rs::parser::{parse_body_fragment, NodeExt};
    ///
    /// let doc = parse_body_fragment("<style>p{}</style><p>x</p>");
    /// let html = doc.first_child().unwrap();
    /// let names: Vec<_> = html
    ///     .children()
    ///     .filter_map(|c| c.element_name().map(String::from))
    ///     .collect();
    /// assert_eq!(names, ["style", "p"]);
    /// ```
    pub fn parse_body_fragment(html: &str) -> NodeRef {
        let context = QualName::new(None, html5ever::ns!(html), LocalName::from("body"));
        kuchikikiki::parse_fragment(context, vec![]).one(html)
    }
}

/// Filter one rendered page with default [`FilterOptions`].
///
/// Shorthand for `PageFilter::new(rules, FilterOptions::default())
/// .filter_page(title, html)`; build a [`PageFilter`] once instead when
/// processing many pages.
pub fn filter_page(title: &str, html: &str, rules: Arc<RuleSet>) -> PageOutcome {
    PageFilter::new(rules, FilterOptions::default()).filter_page(title, html)
}
