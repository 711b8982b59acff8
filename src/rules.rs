//! The immutable rule set and the loader that builds it from a filter file.

use crate::error::ConfigError;
use crate::exclusion::normalize_title;
use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const EXCLUDE_PAGES: &str = "EXCLUDE_PAGES";
pub const EXCLUDE_CLASSES: &str = "EXCLUDE_CLASSES";
pub const EXCLUDE_IDS: &str = "EXCLUDE_IDS";
pub const TEXT_REPLACE: &str = "TEXT_REPLACE";

const KNOWN_SECTIONS: [&str; 4] = [EXCLUDE_PAGES, EXCLUDE_CLASSES, EXCLUDE_IDS, TEXT_REPLACE];

/// The filter file shipped with the crate.
pub static BUILTIN_FILTERS: &str = include_str!("../filters.yaml");

/// One `TEXT_REPLACE` entry: a compiled pattern and the text that replaces
/// each match.
///
/// The replacement uses the filter-file syntax: `\1` or `\g<1>` inserts a
/// numbered group, `\g<name>` a named one, `\n` and `\t` are the usual
/// escapes and `\\` is a backslash.  Everything else, `$` included, is
/// literal.
#[derive(Debug, Clone)]
pub struct SubstitutionRule {
    pattern: Regex,
    replacement: String,
    template: String,
}

impl SubstitutionRule {
    fn compile(index: usize, pattern: String, replacement: Option<String>) -> Result<Self, ConfigError> {
        let compiled = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
            index,
            pattern,
            source,
        })?;
        let replacement = replacement.unwrap_or_default();
        let template = translate_replacement(&compiled, &replacement).map_err(|reason| {
            ConfigError::InvalidReplacement {
                index,
                replacement: replacement.clone(),
                reason,
            }
        })?;
        Ok(SubstitutionRule {
            pattern: compiled,
            replacement,
            template,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// The replacement text as written.  Empty when the rule only deletes
    /// matches.
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every non-overlapping match in `text`.  Returns
    /// [`Cow::Borrowed`] when nothing matched.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.template.as_str())
    }
}

/// Rewrite a filter-file replacement into a `regex` expansion template.
fn translate_replacement(pattern: &Regex, replacement: &str) -> Result<String, String> {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.next() {
                None => out.push('\\'),
                Some('0') => {
                    let mut value = 0;
                    for _ in 0..2 {
                        match chars.peek().and_then(|d| d.to_digit(8)) {
                            Some(digit) => {
                                value = value * 8 + digit;
                                chars.next();
                            }
                            None => break,
                        }
                    }
                    out.extend(char::from_u32(value));
                }
                Some(first @ '1'..='9') => {
                    let mut digits = String::from(first);
                    if let Some(&second) = chars.peek().filter(|d| d.is_ascii_digit()) {
                        digits.push(second);
                        chars.next();
                    }
                    let three_octal = digits.len() == 2
                        && digits.chars().all(|d| d.is_digit(8))
                        && chars.peek().is_some_and(|d| d.is_digit(8));
                    if three_octal {
                        if let Some(third) = chars.next() {
                            digits.push(third);
                        }
                        let value = u32::from_str_radix(&digits, 8).map_err(|e| e.to_string())?;
                        if value > 0o377 {
                            return Err(format!("octal escape \\{digits} is out of range"));
                        }
                        out.extend(char::from_u32(value));
                    } else {
                        push_group(pattern, &digits, &mut out)?;
                    }
                }
                Some('g') => {
                    if chars.next() != Some('<') {
                        return Err("missing < after \\g".to_string());
                    }
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('>') => break,
                            Some(ch) => name.push(ch),
                            None => return Err(format!("unterminated group name \\g<{name}")),
                        }
                    }
                    push_group(pattern, &name, &mut out)?;
                }
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('f') => out.push('\x0c'),
                Some('v') => out.push('\x0b'),
                Some('a') => out.push('\x07'),
                Some('b') => out.push('\x08'),
                Some('\\') => out.push('\\'),
                Some(other) if other.is_ascii_alphabetic() => {
                    return Err(format!("unknown escape \\{other}"));
                }
                Some(other) => {
                    out.push('\\');
                    if other == '$' {
                        out.push_str("$$");
                    } else {
                        out.push(other);
                    }
                }
            },
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Append `${group}` after checking that `pattern` defines the group.
fn push_group(pattern: &Regex, group: &str, out: &mut String) -> Result<(), String> {
    let known = match group.parse::<usize>() {
        Ok(number) => number < pattern.captures_len(),
        Err(_) => pattern.capture_names().flatten().any(|name| name == group),
    };
    if !known {
        return Err(format!("pattern has no group {group:?}"));
    }
    out.push_str("${");
    out.push_str(group);
    out.push('}');
    Ok(())
}

/// Validated filter rules.
///
/// Built once, then only read.  A `RuleSet` is `Send + Sync`, so one
/// instance (usually behind an `Arc`) serves every worker.
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::{should_exclude_page, RuleSet};
///
/// let rules = RuleSet::from_yaml_str(r#"
/// EXCLUDE_PAGES: ["Template:Navbox"]
/// EXCLUDE_CLASSES: [navbox]
/// "#).unwrap();
///
/// assert!(should_exclude_page("Template:Navbox", &rules));
/// assert!(rules.is_excluded_class("navbox"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    excluded_titles: HashSet<String>,
    excluded_classes: HashSet<String>,
    excluded_ids: HashSet<String>,
    substitution_rules: Vec<SubstitutionRule>,
}

impl RuleSet {
    /// Parse a filter file from YAML text.
    ///
    /// Missing sections and sections set to `null` are treated as empty
    /// lists; a blank or comment-only document gives an empty rule set.
    pub fn from_yaml_str(yaml: &str) -> Result<RuleSet, ConfigError> {
        if is_blank_document(yaml) {
            return Ok(RuleSet::default());
        }
        let value: Value = serde_yaml::from_str(yaml)?;
        RuleSet::from_yaml_value(&value)
    }

    /// Read and parse a filter file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RuleSet, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = RuleSet::from_yaml_str(&text)?;
        debug!(path = %path.display(), summary = %rules.summary(), "loaded filter rules");
        Ok(rules)
    }

    /// The rules from the `filters.yaml` bundled with the crate.
    pub fn builtin() -> Result<RuleSet, ConfigError> {
        RuleSet::from_yaml_str(BUILTIN_FILTERS)
    }

    /// Build a rule set from an already parsed YAML document.
    pub fn from_yaml_value(value: &Value) -> Result<RuleSet, ConfigError> {
        let mapping = match value {
            Value::Null => return Ok(RuleSet::default()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(ConfigError::NotAMapping {
                    found: describe(other),
                })
            }
        };

        for key in mapping.keys() {
            match key.as_str() {
                Some(name) if KNOWN_SECTIONS.contains(&name) => {}
                Some(name) => warn!(section = name, "ignoring unknown filter section"),
                None => warn!(key = describe(key), "ignoring non-string filter section key"),
            }
        }

        let mut builder = RuleSetBuilder::new();
        for title in string_list(mapping, EXCLUDE_PAGES)? {
            builder = builder.exclude_page(title);
        }
        for class in string_list(mapping, EXCLUDE_CLASSES)? {
            builder = builder.exclude_class(class);
        }
        for id in string_list(mapping, EXCLUDE_IDS)? {
            builder = builder.exclude_id(id);
        }

        for (index, entry) in section(mapping, TEXT_REPLACE)?.iter().enumerate() {
            let rule = entry.as_mapping().ok_or(ConfigError::RuleNotAMapping {
                index,
                found: describe(entry),
            })?;
            let pattern = match rule.get("re") {
                None | Some(Value::Null) => return Err(ConfigError::MissingPattern { index }),
                Some(Value::String(pattern)) => pattern.clone(),
                Some(other) => {
                    return Err(ConfigError::NotAString {
                        section: "TEXT_REPLACE.re",
                        index,
                        found: describe(other),
                    })
                }
            };
            let replacement = match rule.get("sub") {
                None | Some(Value::Null) => None,
                Some(Value::String(sub)) => Some(sub.clone()),
                Some(other) => {
                    return Err(ConfigError::NotAString {
                        section: "TEXT_REPLACE.sub",
                        index,
                        found: describe(other),
                    })
                }
            };
            builder = builder.substitute(pattern, replacement);
        }

        builder.build()
    }

    /// Exact, case-sensitive lookup of an already normalized title.  Use
    /// [`crate::should_exclude_page`] for raw titles.
    pub fn is_excluded_title(&self, normalized_title: &str) -> bool {
        self.excluded_titles.contains(normalized_title)
    }

    pub fn is_excluded_class(&self, class_token: &str) -> bool {
        self.excluded_classes.contains(class_token)
    }

    pub fn is_excluded_id(&self, id: &str) -> bool {
        self.excluded_ids.contains(id)
    }

    pub fn excluded_titles(&self) -> impl Iterator<Item = &str> {
        self.excluded_titles.iter().map(String::as_str)
    }

    pub fn excluded_classes(&self) -> impl Iterator<Item = &str> {
        self.excluded_classes.iter().map(String::as_str)
    }

    pub fn excluded_ids(&self) -> impl Iterator<Item = &str> {
        self.excluded_ids.iter().map(String::as_str)
    }

    /// Substitution rules in the order they are applied.
    pub fn substitution_rules(&self) -> &[SubstitutionRule] {
        &self.substitution_rules
    }

    /// `true` when no element can ever be pruned by these rules.
    pub fn prunes_nothing(&self) -> bool {
        self.excluded_classes.is_empty() && self.excluded_ids.is_empty()
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            excluded_pages: self.excluded_titles.len(),
            excluded_classes: self.excluded_classes.len(),
            excluded_ids: self.excluded_ids.len(),
            text_substitutions: self.substitution_rules.len(),
        }
    }
}

/// Collection sizes of a [`RuleSet`], for logs and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub excluded_pages: usize,
    pub excluded_classes: usize,
    pub excluded_ids: usize,
    pub text_substitutions: usize,
}

impl fmt::Display for RuleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} excluded pages, {} excluded classes, {} excluded ids, {} text substitutions",
            self.excluded_pages, self.excluded_classes, self.excluded_ids, self.text_substitutions
        )
    }
}

/// Programmatic construction of a [`RuleSet`].
///
/// Patterns are compiled by [`build`][Self::build], so an invalid pattern
/// fails the same way it would in a filter file.
///
/// ```rust
/// use wikifilter_rs::{apply_substitutions, RuleSetBuilder};
///
/// let rules = RuleSetBuilder::new()
///     .exclude_class("navbox")
///     .substitute("cat", Some("dog"))
///     .build()
///     .unwrap();
/// assert_eq!(apply_substitutions("cat food for cat", &rules), "dog food for dog");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSetBuilder {
    excluded_titles: HashSet<String>,
    excluded_classes: HashSet<String>,
    excluded_ids: HashSet<String>,
    substitutions: Vec<(String, Option<String>)>,
}

impl RuleSetBuilder {
    pub fn new() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// The title is normalized before it is stored.
    pub fn exclude_page<S: AsRef<str>>(mut self, title: S) -> Self {
        self.excluded_titles
            .insert(normalize_title(title.as_ref()).to_string());
        self
    }

    pub fn exclude_class<S: Into<String>>(mut self, class: S) -> Self {
        self.excluded_classes.insert(class.into());
        self
    }

    pub fn exclude_id<S: Into<String>>(mut self, id: S) -> Self {
        self.excluded_ids.insert(id.into());
        self
    }

    /// Append a rewrite rule.  `None` as replacement deletes matches; group
    /// references are written `\1` or `\g<name>` as in a filter file.
    /// Rules are kept in call order, duplicates included.
    pub fn substitute<P, R>(mut self, pattern: P, replacement: Option<R>) -> Self
    where
        P: Into<String>,
        R: Into<String>,
    {
        self.substitutions
            .push((pattern.into(), replacement.map(Into::into)));
        self
    }

    pub fn build(self) -> Result<RuleSet, ConfigError> {
        let substitution_rules = self
            .substitutions
            .into_iter()
            .enumerate()
            .map(|(index, (pattern, replacement))| {
                SubstitutionRule::compile(index, pattern, replacement)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSet {
            excluded_titles: self.excluded_titles,
            excluded_classes: self.excluded_classes,
            excluded_ids: self.excluded_ids,
            substitution_rules,
        })
    }
}

fn is_blank_document(yaml: &str) -> bool {
    yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

fn section<'a>(mapping: &'a Mapping, name: &'static str) -> Result<&'a [Value], ConfigError> {
    match mapping.get(name) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Sequence(items)) => Ok(items.as_slice()),
        Some(other) => Err(ConfigError::NotAList {
            section: name,
            found: describe(other),
        }),
    }
}

fn string_list<'a>(mapping: &'a Mapping, name: &'static str) -> Result<Vec<&'a str>, ConfigError> {
    section(mapping, name)?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str().ok_or(ConfigError::NotAString {
                section: name,
                index,
                found: describe(item),
            })
        })
        .collect()
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_loads_all_four_sections() {
        let rules = RuleSet::from_yaml_str(
            r#"
# comments are fine
EXCLUDE_PAGES:
  - "Template:Navbox"
  - "Template:Coord"
EXCLUDE_CLASSES:
  - navbox
  - collapsible
EXCLUDE_IDS:
  - coordinates
TEXT_REPLACE:
  - re: 'tiger'
  - re: 'cat'
    sub: 'dog'
"#,
        )
        .unwrap();

        assert!(rules.is_excluded_title("Template:Navbox"));
        assert!(rules.is_excluded_title("Template:Coord"));
        assert!(rules.is_excluded_class("collapsible"));
        assert!(rules.is_excluded_id("coordinates"));
        let subs = rules.substitution_rules();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].pattern().as_str(), "tiger");
        assert_eq!(subs[0].replacement(), "");
        assert_eq!(subs[1].replacement(), "dog");
    }

    #[test]
    fn test_missing_and_null_sections_are_empty() {
        let rules = RuleSet::from_yaml_str("EXCLUDE_PAGES:\nEXCLUDE_IDS: ~\n").unwrap();
        assert_eq!(
            rules.summary(),
            RuleSummary {
                excluded_pages: 0,
                excluded_classes: 0,
                excluded_ids: 0,
                text_substitutions: 0,
            }
        );
        assert!(rules.prunes_nothing());
    }

    #[test]
    fn test_blank_document_is_empty_rule_set() {
        let rules = RuleSet::from_yaml_str("# nothing yet\n\n").unwrap();
        assert_eq!(rules.summary().excluded_pages, 0);
        assert!(RuleSet::from_yaml_str("").unwrap().prunes_nothing());
    }

    #[test]
    fn test_duplicates_are_collapsed_except_substitutions() {
        let rules = RuleSet::from_yaml_str(
            r#"
EXCLUDE_PAGES: ["Template:X", "Template:X", "  Template:X  "]
EXCLUDE_CLASSES: [navbox, navbox]
EXCLUDE_IDS: [toc, toc]
TEXT_REPLACE:
  - re: 'aa'
    sub: 'a'
  - re: 'aa'
    sub: 'a'
"#,
        )
        .unwrap();
        let summary = rules.summary();
        assert_eq!(summary.excluded_pages, 1);
        assert_eq!(summary.excluded_classes, 1);
        assert_eq!(summary.excluded_ids, 1);
        assert_eq!(summary.text_substitutions, 2);
    }

    #[test]
    fn test_titles_are_trimmed_but_keep_case() {
        let rules = RuleSet::from_yaml_str("EXCLUDE_PAGES: [\"  Template:Navbox \"]").unwrap();
        assert!(rules.is_excluded_title("Template:Navbox"));
        assert!(!rules.is_excluded_title("template:navbox"));
    }

    #[test]
    fn test_rule_without_pattern_is_rejected() {
        let err = RuleSet::from_yaml_str(
            r#"
TEXT_REPLACE:
  - re: 'ok'
  - sub: 'orphan'
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingPattern { index: 1 }));
    }

    #[test]
    fn test_invalid_pattern_is_rejected_at_load() {
        let err = RuleSet::from_yaml_str("TEXT_REPLACE:\n  - re: '(unclosed'\n").unwrap_err();
        match err {
            ConfigError::InvalidPattern { index, pattern, .. } => {
                assert_eq!(index, 0);
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_section_must_be_a_list() {
        let err = RuleSet::from_yaml_str("EXCLUDE_CLASSES: navbox\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotAList {
                section: EXCLUDE_CLASSES,
                found: "a string"
            }
        ));
    }

    #[test]
    fn test_list_entries_must_be_strings() {
        let err = RuleSet::from_yaml_str("EXCLUDE_IDS:\n  - toc\n  - 42\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotAString {
                section: EXCLUDE_IDS,
                index: 1,
                found: "a number"
            }
        ));
    }

    #[test]
    fn test_rule_entries_must_be_mappings() {
        let err = RuleSet::from_yaml_str("TEXT_REPLACE:\n  - 'tiger'\n").unwrap_err();
        assert!(matches!(err, ConfigError::RuleNotAMapping { index: 0, .. }));

        let err = RuleSet::from_yaml_str("TEXT_REPLACE:\n  - re: 'x'\n    sub: [1]\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotAString {
                section: "TEXT_REPLACE.sub",
                index: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_top_level_must_be_a_mapping() {
        let err = RuleSet::from_yaml_str("- navbox\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { found: "a list" }));
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let rules = RuleSet::from_yaml_str("EXCLUDE_TABLES: [x]\nEXCLUDE_IDS: [toc]\n").unwrap();
        assert!(rules.is_excluded_id("toc"));
    }

    #[test]
    fn test_replacement_uses_filter_file_syntax() {
        let rules = RuleSet::from_yaml_str(
            r#"
TEXT_REPLACE:
  - re: 'price'
    sub: 'US$5'
  - re: '(\w+)@'
    sub: '\1 at '
"#,
        )
        .unwrap();
        let subs = rules.substitution_rules();
        assert_eq!(subs[0].replacement(), "US$5");
        assert_eq!(subs[0].apply("price"), "US$5");
        assert_eq!(subs[1].replacement(), r"\1 at ");
        assert_eq!(subs[1].apply("bob@"), "bob at ");
    }

    #[test]
    fn test_invalid_replacement_is_rejected_at_load() {
        for sub in [r"\2", r"\g<missing>", r"\g<1", r"\q"] {
            let yaml = format!("TEXT_REPLACE:\n  - re: '(x)'\n    sub: '{sub}'\n");
            let err = RuleSet::from_yaml_str(&yaml).unwrap_err();
            match err {
                ConfigError::InvalidReplacement {
                    index, replacement, ..
                } => {
                    assert_eq!(index, 0);
                    assert_eq!(replacement, sub);
                }
                other => panic!("unexpected error for {sub}: {other}"),
            }
        }
    }

    #[test]
    fn test_yaml_syntax_error() {
        let err = RuleSet::from_yaml_str("EXCLUDE_IDS: [toc\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "EXCLUDE_CLASSES: [navbox]").unwrap();
        let rules = RuleSet::from_path(file.path()).unwrap();
        assert!(rules.is_excluded_class("navbox"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("filters.yaml");
        let err = RuleSet::from_path(&missing).unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtin_filters_load() {
        let rules = RuleSet::builtin().unwrap();
        assert!(rules.is_excluded_title("Template:Navbox"));
        for class in ["navbox", "collapsible", "autocollapse", "plainlinksneverexpand", "navbar"] {
            assert!(rules.is_excluded_class(class), "{class} should be excluded");
        }
        assert!(rules.is_excluded_id("coordinates"));
        assert!(rules.substitution_rules().is_empty());
    }

    #[test]
    fn test_builder_reports_invalid_pattern_index() {
        let err = RuleSetBuilder::new()
            .substitute("fine", None::<String>)
            .substitute("[broken", Some("x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { index: 1, .. }));
    }

    #[test]
    fn test_independent_rule_sets() {
        let a = RuleSetBuilder::new().exclude_class("a").build().unwrap();
        let b = RuleSetBuilder::new().exclude_class("b").build().unwrap();
        assert!(a.is_excluded_class("a") && !a.is_excluded_class("b"));
        assert!(b.is_excluded_class("b") && !b.is_excluded_class("a"));
    }

    #[test]
    fn test_rule_set_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleSet>();
    }
}
