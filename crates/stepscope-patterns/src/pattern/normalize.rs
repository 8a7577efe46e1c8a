//! Normalisation of raw step fragments into regex source.
//!
//! Each stage is a pure, total function over `&str`. They run in a fixed
//! order and later stages rely on the output shape of earlier ones, so the
//! only public entry point is [`normalize_step_pattern`].

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::custom::CUSTOM_PLACEHOLDER_RE;

static INTERPOLATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{.*?\}").unwrap_or_else(|_| unreachable!()));

static OPTIONAL_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([a-z]+)\)").unwrap_or_else(|_| unreachable!()));

static ALTERNATIVE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z]+(?:/[a-zA-Z]+)+").unwrap_or_else(|_| unreachable!())
});

static QUANTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\d+(?:,\d*)?\}").unwrap_or_else(|_| unreachable!()));

/// Typed parameter placeholders and the regex fragment replacing each.
///
/// `{stringInDoubleQuotes}` must be rewritten before `{string}` is, and the
/// bare `{}` last.
const TYPED_PARAMETERS: [(&str, &str); 5] = [
    ("{float}", r"-?\d*\.?\d+"),
    ("{int}", r"-?\d+"),
    ("{stringInDoubleQuotes}", r#""[^"]+""#),
    ("{string}", r#""[^"]+""#),
    ("{}", ".*"),
];

/// Characters the regex engine gives meaning to, and which therefore keep
/// their escaping backslash.
const REGEX_META: &str = r"\.+*?()|[]{}^$#&-~";

/// Convert one raw step-definition fragment into regex source.
///
/// The fragment may already be a regular expression (definitions written as
/// `/^I have (\d+) cats$/`), a Cucumber expression (`I have {int} cats`) or a
/// mix of both. Custom-parameter substitution is expected to have happened
/// on the raw text before this is called.
///
/// The result is not guaranteed to compile; callers discard fragments whose
/// normalised form the regex engine rejects.
///
/// # Examples
/// ```
/// use stepscope_patterns::normalize_step_pattern;
///
/// assert_eq!(normalize_step_pattern("I have {int} cat(s)"), r"I have -?\d+ cat(s)?");
/// assert_eq!(normalize_step_pattern("I go/run home"), "I (go|run) home");
/// ```
#[must_use]
pub fn normalize_step_pattern(fragment: &str) -> String {
    let step = replace_interpolations(fragment);
    let step = replace_typed_parameters(&step);
    let step = mark_optional_text(&step);
    let step = expand_alternative_text(&step);
    let step = replace_custom_placeholders(&step);
    escape_stray_metacharacters(&step)
}

/// Stage 1. Pre: raw fragment. Post: no `#{...}` interpolation remains; each
/// was replaced by `.*`.
fn replace_interpolations(step: &str) -> String {
    INTERPOLATION_RE.replace_all(step, ".*").into_owned()
}

/// Stage 2. Pre: no interpolation markers. Post: no `{float}`, `{int}`,
/// `{string}`, `{stringInDoubleQuotes}` or `{}` remains.
fn replace_typed_parameters(step: &str) -> String {
    TYPED_PARAMETERS
        .iter()
        .fold(step.to_owned(), |acc, (placeholder, pattern)| {
            acc.replace(placeholder, pattern)
        })
}

/// Stage 3. Post: every `(word)` of lowercase letters is followed by `?`.
fn mark_optional_text(step: &str) -> String {
    OPTIONAL_TEXT_RE.replace_all(step, "(${1})?").into_owned()
}

/// Stage 4. Post: every `a/b/c` run of bare words reads `(a|b|c)`.
fn expand_alternative_text(step: &str) -> String {
    ALTERNATIVE_TEXT_RE
        .replace_all(step, |caps: &Captures<'_>| {
            let run = caps.get(0).map_or("", |m| m.as_str());
            format!("({})", run.replace('/', "|"))
        })
        .into_owned()
}

/// Stage 5. Pre: typed placeholders are gone. Post: every remaining
/// `{name}` not preceded by a backslash and not starting with a digit or
/// comma is a `.*` wildcard. Repetition counts such as `{2}` and `{1,3}`
/// survive.
fn replace_custom_placeholders(step: &str) -> String {
    CUSTOM_PLACEHOLDER_RE.replace_all(step, "${1}.*").into_owned()
}

/// Stage 6. Post: literal text can no longer be read as regex syntax.
///
/// Braces that do not form a repetition count are escaped, a trailing lone
/// backslash becomes a literal backslash, and escapes of characters the
/// regex engine treats literally anyway (`\/`, `\"`, `\'`...) lose their
/// backslash.
fn escape_stray_metacharacters(step: &str) -> String {
    let mut out = String::with_capacity(step.len().saturating_add(8));
    let mut chars = step.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, next)) if next.is_ascii_punctuation() && !REGEX_META.contains(next) => {
                    out.push(next);
                }
                Some((_, next)) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str(r"\\"),
            },
            '{' => {
                let Some(quantifier) = step
                    .get(index..)
                    .and_then(|rest| QUANTIFIER_RE.find(rest))
                    .filter(|_| !out.is_empty())
                else {
                    out.push_str(r"\{");
                    continue;
                };
                out.push_str(quantifier.as_str());
                for _ in 1..quantifier.as_str().chars().count() {
                    chars.next();
                }
            }
            '}' => out.push_str(r"\}"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("I say #{greeting} loudly", "I say .* loudly")]
    #[case("#{a} and #{b}", ".* and .*")]
    fn replaces_interpolation(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(replace_interpolations(input), expected);
    }

    #[rstest]
    #[case("I have {int} cats", r"I have -?\d+ cats")]
    #[case("weight {float}", r"weight -?\d*\.?\d+")]
    #[case("I say {string}", r#"I say "[^"]+""#)]
    #[case("I say {stringInDoubleQuotes}", r#"I say "[^"]+""#)]
    #[case("anything {} goes", "anything .* goes")]
    fn replaces_typed_parameters(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(replace_typed_parameters(input), expected);
    }

    #[test]
    fn marks_lowercase_words_in_parentheses_optional() {
        assert_eq!(mark_optional_text("I have cat(s)"), "I have cat(s)?");
        assert_eq!(mark_optional_text(r"I have (\d+)"), r"I have (\d+)");
        assert_eq!(mark_optional_text("(Upper)"), "(Upper)");
    }

    #[test]
    fn rewrites_slash_separated_words_as_alternation() {
        assert_eq!(
            expand_alternative_text("I click/tap/press the button"),
            "I (click|tap|press) the button"
        );
        assert_eq!(expand_alternative_text("a / b"), "a / b");
    }

    #[rstest]
    #[case("I pick {color}", "I pick .*")]
    #[case("{color} wins", ".* wins")]
    #[case(r"\d{2}", r"\d{2}")]
    #[case(r"\d{1,3}", r"\d{1,3}")]
    #[case(r"keep \{literal}", r"keep \{literal}")]
    fn replaces_custom_placeholders(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(replace_custom_placeholders(input), expected);
    }

    #[rstest]
    #[case(r"^I go to \/home$", "^I go to /home$")]
    #[case(r#"I say \"hi\""#, r#"I say "hi""#)]
    #[case(r"\d{2} items", r"\d{2} items")]
    #[case("{2} items", r"\{2\} items")]
    #[case("a { b } c", r"a \{ b \} c")]
    #[case(r"ends with \", r"ends with \\")]
    #[case(r"keep \(paren\)", r"keep \(paren\)")]
    fn escapes_stray_metacharacters(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_stray_metacharacters(input), expected);
    }

    #[rstest]
    #[case("I have {int} cat(s)", r"I have -?\d+ cat(s)?")]
    #[case(r"^I have (\d+) cats$", r"^I have (\d+) cats$")]
    #[case("I open/close the {door} now", "I (open|close) the .* now")]
    #[case("value #{x} is {float}", r"value .* is -?\d*\.?\d+")]
    fn runs_full_pipeline_in_order(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_step_pattern(input), expected);
    }

    #[test]
    fn normalised_output_compiles() {
        for fragment in [
            "I have {int} cat(s)",
            "a { b } c",
            r"^I go to \/home$",
            "I pick {color} from {palette}",
            r"trailing \",
        ] {
            let source = normalize_step_pattern(fragment);
            assert!(
                Regex::new(&source).is_ok(),
                "normalised {fragment:?} into invalid regex {source:?}"
            );
        }
    }
}
