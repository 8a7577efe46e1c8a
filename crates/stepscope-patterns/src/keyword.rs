//! Gherkin keyword classification.
//!
//! Feature lines and step definitions are both introduced by a keyword. This
//! module provides the canonical [`GherkinKind`] enum and the
//! [`KeywordTable`] that maps spellings (including configured synonyms) onto
//! it and renders the alternations used by the line grammars.

use std::fmt;
use std::str::FromStr;

/// Classification of the keyword a step was written or declared under.
///
/// `And` and `But` are kept distinct so strict matching can resolve them
/// against the nearest preceding primary keyword. Anything that is not one
/// of the five Gherkin step keywords (for example `defineStep` or the `*`
/// bullet) classifies as [`Other`](Self::Other).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GherkinKind {
    /// Setup preconditions for a scenario.
    Given,
    /// Perform an action when testing behaviour.
    When,
    /// Assert the expected outcome of a scenario.
    Then,
    /// Additional conditions that share context with the previous step.
    And,
    /// Negative or contrasting conditions.
    But,
    /// Keyword-agnostic definitions and bullets.
    Other,
}

impl GherkinKind {
    /// Return the keyword as a string slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepscope_patterns::GherkinKind;
    ///
    /// assert_eq!(GherkinKind::Given.as_str(), "Given");
    /// assert_eq!(GherkinKind::Other.as_str(), "Other");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
            Self::Other => "Other",
        }
    }

    /// Whether the keyword is one of `Given`, `When` or `Then`.
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        matches!(self, Self::Given | Self::When | Self::Then)
    }

    /// Whether the keyword continues the previous step (`And`/`But`).
    #[must_use]
    pub const fn is_conjunction(&self) -> bool {
        matches!(self, Self::And | Self::But)
    }
}

impl fmt::Display for GherkinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`GherkinKind`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GherkinKindParseError(pub String);

impl fmt::Display for GherkinKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid gherkin keyword: {}", self.0)
    }
}

impl std::error::Error for GherkinKindParseError {}

impl FromStr for GherkinKind {
    type Err = GherkinKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        [
            Self::Given,
            Self::When,
            Self::Then,
            Self::And,
            Self::But,
            Self::Other,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| GherkinKindParseError(trimmed.to_owned()))
    }
}

/// Definition-only keywords accepted in front of a step pattern.
const DEFINITION_ONLY_WORDS: [&str; 3] = ["defineStep", "Step", "StepDefinition"];

/// Keyword spellings recognised in feature lines and step definitions.
///
/// The default table holds the English keywords and the `*` bullet. Extra
/// spellings are added per kind with [`with_synonyms`](Self::with_synonyms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    entries: Vec<(String, GherkinKind)>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            entries: vec![
                ("Given".to_owned(), GherkinKind::Given),
                ("When".to_owned(), GherkinKind::When),
                ("Then".to_owned(), GherkinKind::Then),
                ("And".to_owned(), GherkinKind::And),
                ("But".to_owned(), GherkinKind::But),
                ("*".to_owned(), GherkinKind::Other),
            ],
        }
    }
}

impl KeywordTable {
    /// Register additional spellings for `kind`.
    ///
    /// Blank spellings and spellings already present are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepscope_patterns::{GherkinKind, KeywordTable};
    ///
    /// let table = KeywordTable::default().with_synonyms(GherkinKind::Given, ["Dado"]);
    /// assert_eq!(table.classify("Dado"), GherkinKind::Given);
    /// ```
    #[must_use]
    pub fn with_synonyms<I, S>(mut self, kind: GherkinKind, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            let word = word.into();
            let word = word.trim();
            if word.is_empty() || self.entries.iter().any(|(known, _)| known == word) {
                continue;
            }
            self.entries.push((word.to_owned(), kind));
        }
        self
    }

    /// Classify a keyword spelling, ignoring ASCII case.
    ///
    /// Unknown spellings (including definition-only words such as
    /// `defineStep`) classify as [`GherkinKind::Other`].
    #[must_use]
    pub fn classify(&self, word: &str) -> GherkinKind {
        let word = word.trim();
        self.entries
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(word))
            .map_or(GherkinKind::Other, |(_, kind)| *kind)
    }

    /// Regex alternation of every feature-line keyword, longest first.
    #[must_use]
    pub fn feature_alternation(&self) -> String {
        alternation(self.entries.iter().map(|(word, _)| word.as_str()))
    }

    /// Regex alternation of the keywords accepted in front of a definition.
    ///
    /// The `*` bullet is feature-only; `defineStep`, `Step` and
    /// `StepDefinition` are definition-only.
    #[must_use]
    pub fn definition_alternation(&self) -> String {
        alternation(
            self.entries
                .iter()
                .map(|(word, _)| word.as_str())
                .filter(|word| *word != "*")
                .chain(DEFINITION_ONLY_WORDS),
        )
    }
}

fn alternation<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    words.dedup();
    words
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Given", GherkinKind::Given)]
    #[case("given", GherkinKind::Given)]
    #[case(" WhEn ", GherkinKind::When)]
    #[case("THEN", GherkinKind::Then)]
    #[case("AND", GherkinKind::And)]
    #[case(" but ", GherkinKind::But)]
    #[case("other", GherkinKind::Other)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: GherkinKind) {
        assert_eq!(input.parse::<GherkinKind>(), Ok(expected));
    }

    #[test]
    fn rejects_invalid_keyword() {
        let err = "defineStep".parse::<GherkinKind>().err();
        assert_eq!(err, Some(GherkinKindParseError("defineStep".into())));
    }

    #[rstest]
    #[case("Given", GherkinKind::Given)]
    #[case("then", GherkinKind::Then)]
    #[case("defineStep", GherkinKind::Other)]
    #[case("*", GherkinKind::Other)]
    #[case("Whatever", GherkinKind::Other)]
    fn classifies_spellings(#[case] word: &str, #[case] expected: GherkinKind) {
        assert_eq!(KeywordTable::default().classify(word), expected);
    }

    #[test]
    fn primary_and_conjunction_predicates() {
        assert!(GherkinKind::When.is_primary());
        assert!(!GherkinKind::And.is_primary());
        assert!(GherkinKind::But.is_conjunction());
        assert!(!GherkinKind::Other.is_conjunction());
    }

    #[test]
    fn synonyms_extend_alternations() {
        let table = KeywordTable::default()
            .with_synonyms(GherkinKind::Given, ["Gegeben sei", " ", "Given"])
            .with_synonyms(GherkinKind::And, ["Und"]);
        assert_eq!(table.classify("gegeben sei"), GherkinKind::Given);
        assert_eq!(table.classify("Und"), GherkinKind::And);
        let feature = table.feature_alternation();
        assert!(feature.starts_with("Gegeben sei|"));
        assert!(feature.contains(r"\*"));
        assert_eq!(feature.matches("Given").count(), 1);
    }

    #[test]
    fn definition_alternation_excludes_bullet() {
        let alternation = KeywordTable::default().definition_alternation();
        assert!(!alternation.contains('*'));
        assert!(alternation.starts_with("StepDefinition|defineStep|"));
        assert!(alternation.split('|').any(|word| word == "Step"));
    }
}
