//! Step-pattern normalisation, expansion and matcher construction.

mod invariants;
mod normalize;
mod partial;

use regex::Regex;

use crate::errors::PatternError;

pub use invariants::expand_invariants;
pub use normalize::normalize_step_pattern;
pub use partial::{build_prefix_pattern, split_pattern_tokens};

/// A compiled step matcher.
///
/// Only two questions may be asked of a matcher: whether it accepts a piece
/// of text, and which space-separated tokens its source is made of. The
/// underlying regex engine stays an implementation detail.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
}

impl Matcher {
    /// Compile `source` into a matcher.
    ///
    /// # Errors
    /// Returns [`PatternError::Regex`] when the regex engine rejects the
    /// source.
    ///
    /// # Examples
    /// ```
    /// use stepscope_patterns::Matcher;
    ///
    /// let matcher = Matcher::new(r"I have -?\d+ cats").expect("valid source");
    /// assert!(matcher.is_match("I have 3 cats"));
    /// assert!(Matcher::new("I (have").is_err());
    /// ```
    pub fn new(source: &str) -> Result<Self, PatternError> {
        Regex::new(source)
            .map(|regex| Self { regex })
            .map_err(|err| PatternError::regex(source, err))
    }

    /// Whether the matcher accepts `text`.
    ///
    /// Matchers are not implicitly anchored; a pattern without `^`/`$`
    /// accepts text containing a match anywhere.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The source the matcher was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Space-separated tokens of the matcher source, bracket aware.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        split_pattern_tokens(self.as_str())
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Matcher {}
