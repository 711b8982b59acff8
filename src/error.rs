use std::path::PathBuf;

/// Everything that can go wrong while turning a filter file into a
/// [`crate::RuleSet`].
///
/// Loading is all-or-nothing: any of these aborts the load and no rule set
/// is produced.  Each variant names the offending section and, for list
/// entries, the zero-based index so the file can be fixed by hand.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read filter file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("filter file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("filter configuration must be a mapping of section names to lists, found {found}")]
    NotAMapping { found: &'static str },

    #[error("{section} must be a list, found {found}")]
    NotAList {
        section: &'static str,
        found: &'static str,
    },

    #[error("{section}[{index}] must be a string, found {found}")]
    NotAString {
        section: &'static str,
        index: usize,
        found: &'static str,
    },

    #[error("TEXT_REPLACE[{index}] must be a mapping with `re` and optional `sub` keys, found {found}")]
    RuleNotAMapping { index: usize, found: &'static str },

    #[error("TEXT_REPLACE[{index}] has no `re` pattern")]
    MissingPattern { index: usize },

    #[error("TEXT_REPLACE[{index}] pattern {pattern:?} does not compile: {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("TEXT_REPLACE[{index}] replacement {replacement:?} is invalid: {reason}")]
    InvalidReplacement {
        index: usize,
        replacement: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_section_and_index() {
        let err = ConfigError::NotAString {
            section: "EXCLUDE_CLASSES",
            index: 3,
            found: "a number",
        };
        assert_eq!(
            err.to_string(),
            "EXCLUDE_CLASSES[3] must be a string, found a number"
        );

        let err = ConfigError::MissingPattern { index: 0 };
        assert_eq!(err.to_string(), "TEXT_REPLACE[0] has no `re` pattern");
    }
}
