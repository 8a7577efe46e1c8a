//! Enumeration of the concrete variants an alternation group denotes.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

/// A parenthesised group containing at least one `|` and no nested
/// parentheses.
static ALTERNATION_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]+\|[^()]+\)").unwrap_or_else(|_| unreachable!()));

/// Expand the first flat alternation group of `pattern`, recursively.
///
/// Each alternative replaces the whole group and the result is expanded
/// again, so disjoint groups multiply out across recursion depth. Groups
/// that contain other parentheses are left untouched. A non-capturing
/// `(?:...)` prefix is dropped together with the group.
///
/// # Examples
/// ```
/// use stepscope_patterns::expand_invariants;
///
/// assert_eq!(
///     expand_invariants("I (go|run|walk) home"),
///     vec!["I go home", "I run home", "I walk home"],
/// );
/// assert_eq!(expand_invariants("I stay home"), vec!["I stay home"]);
/// ```
#[must_use]
pub fn expand_invariants(pattern: &str) -> Vec<String> {
    let Some(group) = ALTERNATION_GROUP_RE.find(pattern) else {
        return vec![pattern.to_owned()];
    };
    let body = group.as_str().replacen("(?:", "", 1);
    let body = body.strip_prefix('(').unwrap_or(&body);
    let body = body.strip_suffix(')').unwrap_or(body);

    body.split('|')
        .flat_map(|variant| {
            let substituted = ALTERNATION_GROUP_RE.replace(pattern, NoExpand(variant));
            expand_invariants(&substituted)
        })
        .collect()
}
