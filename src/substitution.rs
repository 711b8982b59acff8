use crate::rules::RuleSet;
use std::borrow::Cow;
use tracing::trace;

/// Run every `TEXT_REPLACE` rule over `text`, in declaration order.
///
/// Each rule sees the output of the previous one, so a later rule can clean
/// up after an earlier one.  Rules that do not match leave the text as it
/// is; patterns were validated when the rule set was built, so this never
/// fails.
///
/// # Examples
///
/// ```rust
/// use wikifilter_rs::{apply_substitutions, RuleSetBuilder};
///
/// let rules = RuleSetBuilder::new()
///     .substitute("tiger", None::<String>)
///     .build()
///     .unwrap();
/// assert_eq!(apply_substitutions("a tiger b tiger c", &rules), "a  b  c");
/// ```
pub fn apply_substitutions(text: &str, rules: &RuleSet) -> String {
    let mut current = text.to_string();
    for (index, rule) in rules.substitution_rules().iter().enumerate() {
        let rewritten = match rule.apply(&current) {
            Cow::Borrowed(_) => None,
            Cow::Owned(rewritten) => Some(rewritten),
        };
        if let Some(rewritten) = rewritten {
            trace!(rule = index, pattern = rule.pattern().as_str(), "substitution matched");
            current = rewritten;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSetBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn deletes_matches_when_no_replacement() {
        let rules = RuleSetBuilder::new()
            .substitute("tiger", None::<String>)
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("a tiger b tiger c", &rules), "a  b  c");
    }

    #[test]
    fn replaces_every_match() {
        let rules = RuleSetBuilder::new()
            .substitute("cat", Some("dog"))
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("cat food for cat", &rules), "dog food for dog");
    }

    #[test]
    fn rules_compose_left_to_right() {
        let r1 = RuleSetBuilder::new().substitute("cat", Some("dog")).build().unwrap();
        let r2 = RuleSetBuilder::new().substitute("dog", Some("wolf")).build().unwrap();
        let both = RuleSetBuilder::new()
            .substitute("cat", Some("dog"))
            .substitute("dog", Some("wolf"))
            .build()
            .unwrap();

        let input = "cat and dog";
        let chained = apply_substitutions(&apply_substitutions(input, &r1), &r2);
        assert_eq!(apply_substitutions(input, &both), chained);
        assert_eq!(chained, "wolf and wolf");
    }

    #[test]
    fn order_changes_output() {
        let forward = RuleSetBuilder::new()
            .substitute("cat", Some("dog"))
            .substitute("dog", Some("wolf"))
            .build()
            .unwrap();
        let backward = RuleSetBuilder::new()
            .substitute("dog", Some("wolf"))
            .substitute("cat", Some("dog"))
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("cat", &forward), "wolf");
        assert_eq!(apply_substitutions("cat", &backward), "dog");
    }

    #[test]
    fn later_rule_cleans_up_after_earlier_one() {
        let rules = RuleSetBuilder::new()
            .substitute(r"\(listen\)", None::<String>)
            .substitute(r" {2,}", Some(" "))
            .build()
            .unwrap();
        assert_eq!(
            apply_substitutions("Paris (listen) is a city", &rules),
            "Paris is a city"
        );
    }

    #[test]
    fn capture_groups_expand_in_replacement() {
        let rules = RuleSetBuilder::new()
            .substitute(r"(\d+)\s+km", Some(r"\1km"))
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("about 40  km away", &rules), "about 40km away");
    }

    #[test]
    fn dollar_in_replacement_is_literal() {
        let rules = RuleSetBuilder::new()
            .substitute("price", Some("US$5"))
            .substitute(r"(\w+)@", Some(r"\1 at "))
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("price; bob@", &rules), "US$5; bob at ");
    }

    #[test]
    fn named_groups_and_escapes_in_replacement() {
        let rules = RuleSetBuilder::new()
            .substitute(r"(?P<word>\w+)!", Some(r"\g<word>\n\g<0>\\"))
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("hi!", &rules), "hi\nhi!\\");
    }

    #[test]
    fn group_followed_by_digits_and_literal_backslash() {
        let rules = RuleSetBuilder::new()
            .substitute(r"(a)", Some(r"\g<1>0 \& \$"))
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("a", &rules), r"a0 \& \$");
    }

    #[test]
    fn no_match_and_no_rules_leave_text_unchanged() {
        let rules = RuleSetBuilder::new()
            .substitute("zebra", Some("x"))
            .build()
            .unwrap();
        assert_eq!(apply_substitutions("plain text", &rules), "plain text");
        assert_eq!(apply_substitutions("plain text", &RuleSet::default()), "plain text");
        assert_eq!(apply_substitutions("", &rules), "");
    }
}
