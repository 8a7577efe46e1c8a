//! Completion items and the text they insert.

use std::sync::LazyLock;

use regex::Regex;

use crate::custom::custom_placeholders;
use crate::options::MatchOptions;
use crate::pattern::{Matcher, normalize_step_pattern, split_pattern_tokens};
use crate::step::Step;

/// An optional `(`, one escaped char, dot or class, a repetition, an
/// optional `)`.
static CAPTURE_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\()?(?:\\.|\.|\[[^\]]+\])(?:\*|\+|\{[^}]+\})(?:\))?")
        .unwrap_or_else(|_| unreachable!())
});

const QUOTED_STRING_PATTERN: &str = r#""[^"]+""#;

/// Sort prefix placing step completions ahead of other sources.
pub const STEP_SORT_PREFIX: &str = "AAA_";

/// What a completion candidate offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// A step; the insert text is a snippet.
    Step,
    /// A custom-parameter value; the insert text is plain.
    Value,
}

/// One completion offered for a feature line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    /// Text shown in the completion list.
    pub label: String,
    /// Whether this is a step or a parameter value.
    pub kind: CompletionKind,
    /// Step identity, reported back when the item is accepted.
    pub id: Option<String>,
    /// Documentation shown next to the item.
    pub documentation: Option<String>,
    /// Key the editor orders items by.
    pub sort_text: Option<String>,
    /// Text inserted when the item is accepted.
    pub insert_text: String,
}

impl CompletionCandidate {
    /// A step completion inserting `insert_text`.
    #[must_use]
    pub fn step(step: &Step, insert_text: String) -> Self {
        Self {
            label: step.display_text().to_owned(),
            kind: CompletionKind::Step,
            id: Some(step.id().to_owned()),
            documentation: Some(step.documentation().to_owned()),
            sort_text: Some(format!("{STEP_SORT_PREFIX}{}", step.display_text())),
            insert_text,
        }
    }

    /// A plain custom-parameter value.
    #[must_use]
    pub fn value(value: &str, documentation: Option<&str>) -> Self {
        Self {
            label: value.to_owned(),
            kind: CompletionKind::Value,
            id: None,
            documentation: documentation.map(str::to_owned),
            sort_text: None,
            insert_text: value.to_owned(),
        }
    }

    /// Whether the insert text uses snippet syntax.
    #[must_use]
    pub fn is_snippet(&self) -> bool {
        self.kind == CompletionKind::Step
    }
}

/// Compute the text still to be inserted for `pattern_text` after `typed`.
///
/// The normalised pattern is split into tokens and growing token prefixes
/// are tested against `typed`. The first prefix that no longer matches (or
/// a leading bare `.*`) marks where insertion starts. When every prefix
/// matches, the whole pattern text is returned.
///
/// With smart snippets, capture-like fragments of the result become
/// numbered snippet stops, filled with custom-parameter choices when
/// parameter autocompletion is enabled. Otherwise quoted-string patterns
/// are shown as `""`.
///
/// # Examples
/// ```
/// use stepscope_patterns::{MatchOptions, compose_insert_text};
///
/// let options = MatchOptions { smart_snippets: true, ..MatchOptions::default() };
/// assert_eq!(compose_insert_text(&options, r"I have (\d+) cats", "I have "), "${1:} cats");
/// ```
#[must_use]
pub fn compose_insert_text(options: &MatchOptions, pattern_text: &str, typed: &str) -> String {
    let pattern_text = strip_anchors(pattern_text);
    let remaining = remaining_text(pattern_text, typed);
    if options.smart_snippets {
        insert_snippet_stops(options, pattern_text, remaining)
    } else {
        remaining.replace(QUOTED_STRING_PATTERN, "\"\"")
    }
}

fn strip_anchors(text: &str) -> &str {
    let text = text.strip_prefix('^').unwrap_or(text);
    text.strip_suffix('$').unwrap_or(text)
}

fn remaining_text(pattern_text: &str, typed: &str) -> String {
    let tokens = split_pattern_tokens(&normalize_step_pattern(pattern_text));
    for (index, token) in tokens.iter().enumerate() {
        let Some(prefix) = tokens.get(..=index) else {
            break;
        };
        let Ok(matcher) = Matcher::new(&format!("^{}", prefix.join(" "))) else {
            continue;
        };
        if !matcher.is_match(typed) || (index == 0 && token == ".*") {
            return tokens.get(index..).map_or_else(String::new, |rest| rest.join(" "));
        }
    }
    pattern_text.to_owned()
}

fn insert_snippet_stops(options: &MatchOptions, pattern_text: &str, remaining: String) -> String {
    let fragments: Vec<String> = CAPTURE_FRAGMENT_RE
        .find_iter(&remaining)
        .map(|m| m.as_str().to_owned())
        .collect();
    let placeholders = if options.custom_parameters_autocomplete {
        custom_placeholders(pattern_text)
    } else {
        Vec::new()
    };

    fragments
        .iter()
        .enumerate()
        .fold(remaining, |text, (position, fragment)| {
            let number = position.saturating_add(1);
            let choices = placeholders
                .get(position)
                .and_then(|token| options.custom_parameters.get(token))
                .map(|parameter| parameter.autocomplete.join(","))
                .filter(|choices| !choices.is_empty());
            let stop = choices.map_or_else(
                || format!("${{{number}:}}"),
                |choices| {
                    let wrap = &options.wrap_snippets_in;
                    format!("{wrap}${{{number}|{choices}|}}{wrap}")
                },
            );
            text.replacen(fragment.as_str(), &stop, 1)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::{CustomParameter, CustomParameterMap};
    use rstest::rstest;

    fn smart() -> MatchOptions {
        MatchOptions {
            smart_snippets: true,
            ..MatchOptions::default()
        }
    }

    #[rstest]
    #[case(r"I have (\d+) cats", "I have ", r"(\d+) cats")]
    #[case(r"^I have (\d+) cats$", "I ", r"have (\d+) cats")]
    #[case("I log in", "", "I log in")]
    #[case("I log in", "I ", "log in")]
    #[case("I log in", "You ", "I log in")]
    #[case("{} happens", "", ".* happens")]
    fn cuts_at_first_unsatisfied_token(
        #[case] pattern: &str,
        #[case] typed: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(remaining_text(strip_anchors(pattern), typed), expected);
    }

    #[test]
    fn returns_whole_text_when_every_token_matches() {
        assert_eq!(remaining_text("I log in", "I log in"), "I log in");
    }

    #[test]
    fn keeps_groups_together() {
        assert_eq!(
            compose_insert_text(&MatchOptions::default(), "I (open|close) the door", "I "),
            "(open|close) the door"
        );
    }

    #[test]
    fn simplifies_quoted_strings_without_snippets() {
        assert_eq!(
            compose_insert_text(&MatchOptions::default(), "I say {string} twice", "I "),
            r#"say "" twice"#
        );
    }

    #[rstest]
    #[case(r"I have (\d+) cats", "I have ", "${1:} cats")]
    #[case(r"I move (.*) to (\w+)", "I ", "move ${1:} to ${2:}")]
    #[case("I pick [a-z]+ and .*", "I ", "pick ${1:} and ${2:}")]
    #[case("I wait", "I ", "wait")]
    fn numbers_snippet_stops(#[case] pattern: &str, #[case] typed: &str, #[case] expected: &str) {
        assert_eq!(compose_insert_text(&smart(), pattern, typed), expected);
    }

    #[test]
    fn fills_stops_with_parameter_choices() {
        let options = MatchOptions {
            smart_snippets: true,
            custom_parameters_autocomplete: true,
            wrap_snippets_in: "\"".to_owned(),
            custom_parameters: CustomParameterMap::new([
                CustomParameter::literal("{color}", "(red|blue)").with_autocomplete(["red", "blue"]),
                CustomParameter::literal("{size}", ".*"),
            ]),
            ..MatchOptions::default()
        };
        assert_eq!(
            compose_insert_text(&options, "I paint {color} in {size} now", "I "),
            r#"paint "${1|red,blue|}" in ${2:} now"#
        );
    }
}
