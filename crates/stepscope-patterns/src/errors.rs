//! Error types shared by the pattern compilation modules.

use thiserror::Error;

/// Errors surfaced while turning step definitions and keyword grammars into
/// regular expressions.
///
/// None of these are fatal to a scan: callers log them and drop the single
/// candidate (or fall back to a default grammar) before carrying on.
///
/// # Examples
/// ```
/// use stepscope_patterns::PatternError;
/// let source = regex::Regex::new("(").expect_err("unclosed group");
/// let err = PatternError::Regex { pattern: "(".into(), source };
/// assert!(err.to_string().starts_with("failed to compile step pattern `(`"));
/// ```
#[derive(Debug, Error)]
pub enum PatternError {
    /// A normalised step fragment is not valid regex source.
    #[error("failed to compile step pattern `{pattern}`: {source}")]
    Regex {
        /// The normalised source handed to the regex engine.
        pattern: String,
        /// Underlying compilation error.
        #[source]
        source: regex::Error,
    },
    /// A keyword or definition grammar (possibly user supplied) is invalid.
    #[error("invalid {grammar} grammar: {source}")]
    Grammar {
        /// Which grammar failed (`feature line` or `step definition`).
        grammar: &'static str,
        /// Underlying compilation error.
        #[source]
        source: regex::Error,
    },
}

impl PatternError {
    pub(crate) fn regex(pattern: &str, source: regex::Error) -> Self {
        Self::Regex {
            pattern: pattern.to_owned(),
            source,
        }
    }
}
