//! Resolution of feature-file lines into keyword and step text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::PatternError;
use crate::keyword::{GherkinKind, KeywordTable};
use crate::registry::StepRegistry;

static OUTLINE_PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").unwrap_or_else(|_| unreachable!()));

static EXAMPLES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Examples:\s*$").unwrap_or_else(|_| unreachable!()));

static TABLE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\s*").unwrap_or_else(|_| unreachable!()));

/// A feature line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// Char length of the whitespace before the keyword, which is also the
    /// column the keyword starts at.
    pub indent: usize,
    /// The keyword as written.
    pub keyword: String,
    /// Classification of the keyword.
    pub kind: GherkinKind,
    /// Everything after the keyword and the whitespace following it.
    pub text: String,
}

/// Splits feature lines using the configured keyword spellings.
#[derive(Debug, Clone)]
pub struct LineResolver {
    grammar: Regex,
    keywords: KeywordTable,
}

impl LineResolver {
    /// Build the feature-line grammar for `keywords`.
    ///
    /// # Errors
    /// Returns [`PatternError::Grammar`] when the keyword alternation does not
    /// compile.
    pub fn new(keywords: &KeywordTable) -> Result<Self, PatternError> {
        let source = format!(
            r"^(?P<indent>\s*)(?P<keyword>{})(?P<gap>\s+)(?P<text>.*)",
            keywords.feature_alternation()
        );
        Regex::new(&source)
            .map(|grammar| Self {
                grammar,
                keywords: keywords.clone(),
            })
            .map_err(|source| PatternError::Grammar {
                grammar: "feature line",
                source,
            })
    }

    /// Apply the keyword grammar to `line` as written.
    ///
    /// # Examples
    /// ```
    /// use stepscope_patterns::{GherkinKind, KeywordTable, LineResolver};
    ///
    /// let resolver = LineResolver::new(&KeywordTable::default()).expect("default grammar");
    /// let line = resolver.parse("  Given I am logged in").expect("step line");
    /// assert_eq!((line.indent, line.kind, line.text.as_str()), (2, GherkinKind::Given, "I am logged in"));
    /// assert!(resolver.parse("Feature: Login").is_none());
    /// ```
    #[must_use]
    pub fn parse(&self, line: &str) -> Option<ResolvedLine> {
        let caps = self.grammar.captures(line)?;
        let keyword = caps.name("keyword")?.as_str();
        Some(ResolvedLine {
            indent: caps.name("indent").map_or(0, |m| m.as_str().chars().count()),
            keyword: keyword.to_owned(),
            kind: self.keywords.classify(keyword),
            text: caps.name("text").map_or("", |m| m.as_str()).to_owned(),
        })
    }

    /// Resolve `line`, substituting Scenario Outline placeholders from the
    /// Examples tables of `document`.
    ///
    /// Two candidates are produced: one with the raw example values and one
    /// with each value wrapped in double quotes. The quoted candidate wins
    /// when it resolves to a step known to `registry`.
    #[must_use]
    pub fn resolve(
        &self,
        line: &str,
        document: &str,
        registry: &StepRegistry,
    ) -> Option<ResolvedLine> {
        let keys: Vec<String> = OUTLINE_PLACEHOLDER_RE
            .find_iter(line)
            .map(|m| m.as_str().replace(['<', '>'], ""))
            .collect();
        if keys.is_empty() {
            return self.parse(line);
        }
        let values = outline_values(document);
        let plain = substitute_outline(line, &keys, &values, |value| value.to_owned());
        let quoted = substitute_outline(line, &keys, &values, |value| format!("\"{value}\""));
        self.parse(&quoted)
            .filter(|resolved| {
                !resolved.text.is_empty() && registry.lookup(&resolved.text, None).is_some()
            })
            .or_else(|| self.parse(&plain))
    }

    /// The kind a line's keyword stands for under strict matching.
    ///
    /// `And` and `But` take the kind of the nearest earlier line of
    /// `document` (before `line_number`) whose keyword is `Given`, `When` or
    /// `Then`, or [`GherkinKind::Other`] when there is none. Every other kind
    /// stands for itself.
    #[must_use]
    pub fn strict_kind(
        &self,
        kind: GherkinKind,
        line_number: usize,
        document: &str,
        registry: &StepRegistry,
    ) -> GherkinKind {
        if !kind.is_conjunction() {
            return kind;
        }
        let earlier: Vec<&str> = document.lines().take(line_number).collect();
        earlier
            .iter()
            .rev()
            .filter_map(|line| self.resolve(line, document, registry))
            .map(|resolved| resolved.kind)
            .find(GherkinKind::is_primary)
            .unwrap_or(GherkinKind::Other)
    }
}

fn substitute_outline(
    line: &str,
    keys: &[String],
    values: &HashMap<String, String>,
    render: impl Fn(&str) -> String,
) -> String {
    keys.iter().fold(line.to_owned(), |acc, key| {
        let Some(value) = values.get(key) else {
            return acc;
        };
        acc.replacen(&format!("<{key}>"), &render(value), 1)
    })
}

/// Column name to value mapping from the Examples tables of `document`.
///
/// Every `Examples:` line followed by a header row and a data row
/// contributes; later tables override earlier ones. Empty cells are
/// ignored.
///
/// # Examples
/// ```
/// use stepscope_patterns::outline_values;
///
/// let doc = "Examples:\n  | user | count |\n  | bob  | 3     |\n";
/// let values = outline_values(doc);
/// assert_eq!(values.get("user").map(String::as_str), Some("bob"));
/// assert_eq!(values.get("count").map(String::as_str), Some("3"));
/// ```
#[must_use]
pub fn outline_values(document: &str) -> HashMap<String, String> {
    let lines: Vec<&str> = document.lines().collect();
    let mut values = HashMap::new();
    for (index, line) in lines.iter().enumerate() {
        if !EXAMPLES_RE.is_match(line) {
            continue;
        }
        let Some(row) = lines.get(index.saturating_add(2)).filter(|row| !row.is_empty()) else {
            continue;
        };
        let header = lines.get(index.saturating_add(1)).copied().unwrap_or("");
        for (name, value) in table_cells(header).into_iter().zip(table_cells(row)) {
            if !value.is_empty() {
                values.insert(name.to_owned(), value.to_owned());
            }
        }
    }
    values
}

fn table_cells(row: &str) -> Vec<&str> {
    let cells: Vec<&str> = TABLE_SEPARATOR_RE.split(row).collect();
    cells
        .get(1..cells.len().saturating_sub(1))
        .map(<[&str]>::to_vec)
        .unwrap_or_default()
}
