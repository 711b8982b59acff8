use crate::rules::RuleSet;

/// Canonical form of a page title for exclusion lookups: surrounding
/// whitespace is dropped, case and inner spacing are kept.
pub fn normalize_title(title: &str) -> &str {
    title.trim()
}

/// Decide whether a whole page or template should be skipped.
///
/// This is a single hash lookup and is meant to run before the page source
/// is even parsed.  Matching is exact and case-sensitive on the
/// namespace-qualified title (`"Template:Navbox"`, not `"Navbox"`).
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::{should_exclude_page, RuleSetBuilder};
///
/// let rules = RuleSetBuilder::new().exclude_page("Template:Navbox").build().unwrap();
/// assert!(should_exclude_page(" Template:Navbox\n", &rules));
/// assert!(!should_exclude_page("Template:Navbox2", &rules));
/// assert!(!should_exclude_page("Navbox", &rules));
/// ```
pub fn should_exclude_page(title: &str, rules: &RuleSet) -> bool {
    rules.is_excluded_title(normalize_title(title))
}
