//! Configured custom parameters and `{name}` placeholder discovery.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

/// A `{name}` placeholder that is not escaped and does not start with a
/// digit or comma. Group 1 is the preceding character (or empty at the start
/// of the text); group 2 is the name.
pub(crate) static CUSTOM_PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\\])\{((?:[^\d,}][^}]*)?)\}").unwrap_or_else(|_| unreachable!())
});

/// How a custom parameter is located in raw definition text.
#[derive(Debug, Clone)]
pub enum ParameterToken {
    /// Exact text such as `{color}`.
    Literal(String),
    /// Every match of a regular expression.
    Pattern(Regex),
}

impl ParameterToken {
    /// Text the parameter is indexed and documented under.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::Pattern(regex) => regex.as_str(),
        }
    }

    fn substitute(&self, text: &str, value: &str) -> String {
        match self {
            Self::Literal(token) if token.is_empty() => text.to_owned(),
            Self::Literal(token) => text.replace(token.as_str(), value),
            Self::Pattern(regex) => regex.replace_all(text, NoExpand(value)).into_owned(),
        }
    }
}

/// One configured custom parameter.
#[derive(Debug, Clone)]
pub struct CustomParameter {
    /// Token replaced in raw definition text.
    pub token: ParameterToken,
    /// Regex fragment the token is replaced with.
    pub value: String,
    /// Values offered when completing inside the token.
    pub autocomplete: Vec<String>,
    /// Human-readable meaning shown in step documentation.
    pub documentation: Option<String>,
}

impl CustomParameter {
    /// A parameter replacing the literal `token` with `value`.
    ///
    /// # Examples
    /// ```
    /// use stepscope_patterns::CustomParameter;
    ///
    /// let color = CustomParameter::literal("{color}", "(red|blue)")
    ///     .with_autocomplete(["red", "blue"])
    ///     .with_documentation("A primary colour");
    /// assert_eq!(color.token.key(), "{color}");
    /// assert_eq!(color.autocomplete, vec!["red", "blue"]);
    /// ```
    #[must_use]
    pub fn literal(token: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            token: ParameterToken::Literal(token.into()),
            value: value.into(),
            autocomplete: Vec::new(),
            documentation: None,
        }
    }

    /// A parameter replacing every match of `pattern` with `value`.
    #[must_use]
    pub fn pattern(pattern: Regex, value: impl Into<String>) -> Self {
        Self {
            token: ParameterToken::Pattern(pattern),
            value: value.into(),
            autocomplete: Vec::new(),
            documentation: None,
        }
    }

    /// Attach completion choices.
    #[must_use]
    pub fn with_autocomplete<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.autocomplete = values.into_iter().map(Into::into).collect();
        self
    }

    /// Attach documentation.
    #[must_use]
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }
}

/// Custom parameters in configuration order, indexed by token.
///
/// Substitution applies every parameter in order. Lookups by token resolve
/// to the last parameter configured under that token.
#[derive(Debug, Clone, Default)]
pub struct CustomParameterMap {
    parameters: Vec<CustomParameter>,
    index: HashMap<String, usize>,
}

impl CustomParameterMap {
    /// Build a map from parameters in configuration order.
    #[must_use]
    pub fn new(parameters: impl IntoIterator<Item = CustomParameter>) -> Self {
        let parameters: Vec<CustomParameter> = parameters.into_iter().collect();
        let index = parameters
            .iter()
            .enumerate()
            .map(|(position, parameter)| (parameter.token.key().to_owned(), position))
            .collect();
        Self { parameters, index }
    }

    /// Look up the parameter configured under `token`.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&CustomParameter> {
        self.index
            .get(token)
            .and_then(|position| self.parameters.get(*position))
    }

    /// Whether no parameters are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Configured parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = &CustomParameter> {
        self.parameters.iter()
    }

    /// Replace every configured token in `text` with its value.
    ///
    /// # Examples
    /// ```
    /// use stepscope_patterns::{CustomParameter, CustomParameterMap};
    ///
    /// let map = CustomParameterMap::new([CustomParameter::literal("{color}", "(red|blue)")]);
    /// assert_eq!(map.substitute("I pick {color}"), "I pick (red|blue)");
    /// ```
    #[must_use]
    pub fn substitute(&self, text: &str) -> String {
        self.parameters
            .iter()
            .fold(text.to_owned(), |acc, parameter| {
                parameter.token.substitute(&acc, &parameter.value)
            })
    }

    /// The configured parameter whose `{...}` token surrounds `character`.
    ///
    /// `character` is a char offset into `line`. The nearest `{` at or before
    /// it and the nearest `}` at or after it delimit the candidate token.
    #[must_use]
    pub fn highlighted_parameter(&self, line: &str, character: usize) -> Option<&CustomParameter> {
        let chars: Vec<char> = line.chars().collect();
        let open = chars
            .iter()
            .take(character.saturating_add(1))
            .rposition(|ch| *ch == '{')?;
        let close = chars
            .iter()
            .skip(character)
            .position(|ch| *ch == '}')
            .map(|offset| offset.saturating_add(character))?;
        if close <= open {
            return None;
        }
        let phrase: String = chars.get(open..=close)?.iter().collect();
        self.get(&phrase)
    }
}

/// `{name}` placeholders of `text` in order of appearance, duplicates kept.
///
/// # Examples
/// ```
/// use stepscope_patterns::custom_placeholders;
///
/// assert_eq!(
///     custom_placeholders("I move {piece} to {square} with {piece}"),
///     vec!["{piece}", "{square}", "{piece}"],
/// );
/// ```
#[must_use]
pub fn custom_placeholders(text: &str) -> Vec<String> {
    CUSTOM_PLACEHOLDER_RE
        .captures_iter(text)
        .map(|caps| format!("{{{}}}", caps.get(2).map_or("", |m| m.as_str())))
        .collect()
}

/// Distinct `{name}` placeholders of `text`, sorted.
#[must_use]
pub fn unique_custom_placeholders(text: &str) -> Vec<String> {
    let mut placeholders = custom_placeholders(text);
    placeholders.sort();
    placeholders.dedup();
    placeholders
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn parameters() -> CustomParameterMap {
        CustomParameterMap::new([
            CustomParameter::literal("{color}", "(red|blue)").with_autocomplete(["red", "blue"]),
            CustomParameter::literal("{size}", r"\d+"),
        ])
    }

    #[rstest]
    fn substitutes_every_occurrence(parameters: CustomParameterMap) {
        assert_eq!(
            parameters.substitute("a {color} {size} {color}"),
            r"a (red|blue) \d+ (red|blue)"
        );
    }

    #[test]
    fn substitutes_pattern_tokens() {
        let token = Regex::new(r"\{[a-z]+Id\}").unwrap_or_else(|_| unreachable!());
        let map = CustomParameterMap::new([CustomParameter::pattern(token, "$id")]);
        assert_eq!(map.substitute("open {userId} and {postId}"), "open $id and $id");
    }

    #[test]
    fn empty_literal_token_is_ignored() {
        let map = CustomParameterMap::new([CustomParameter::literal("", "x")]);
        assert_eq!(map.substitute("abc"), "abc");
    }

    #[test]
    fn later_parameter_wins_lookup() {
        let map = CustomParameterMap::new([
            CustomParameter::literal("{a}", "1"),
            CustomParameter::literal("{a}", "2"),
        ]);
        assert_eq!(map.get("{a}").map(|p| p.value.as_str()), Some("2"));
    }

    #[rstest]
    #[case(8, Some("{color}"))]
    #[case(11, Some("{color}"))]
    #[case(14, Some("{color}"))]
    #[case(3, None)]
    #[case(16, None)]
    #[case(21, None)]
    fn detects_highlighted_parameter(
        parameters: CustomParameterMap,
        #[case] character: usize,
        #[case] expected: Option<&str>,
    ) {
        let line = "Given I {color} it {other}";
        let found = parameters
            .highlighted_parameter(line, character)
            .map(|p| p.token.key());
        assert_eq!(found, expected);
    }

    #[test]
    fn finds_placeholders_in_order() {
        assert_eq!(
            custom_placeholders("{a} x {b} {a} {1} {,2} \\{c}"),
            vec!["{a}", "{b}", "{a}"]
        );
        assert_eq!(unique_custom_placeholders("{b} {a} {b}"), vec!["{a}", "{b}"]);
    }
}
