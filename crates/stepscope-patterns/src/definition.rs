//! Extraction of step definitions from source text.
//!
//! A definition is a line such as `Given(/^I have (\d+) cats$/, ...)`,
//! `@When("I log in")` or `defineStep('I wait', ...)`: an optional prefix
//! not ending in a word character, a definition keyword, some filler, and
//! the step body between two identical delimiters.

use std::collections::HashMap;

use regex::{Captures, Regex, RegexBuilder};

use crate::custom::CustomParameterMap;
use crate::errors::PatternError;
use crate::keyword::{GherkinKind, KeywordTable};
use crate::options::MatchOptions;

/// Compiled grammar recognising step-definition lines.
#[derive(Debug, Clone)]
pub struct DefinitionGrammar {
    regex: Regex,
}

impl DefinitionGrammar {
    /// Build the grammar from the keyword table and the optional
    /// `gherkin_definition_part` and `step_regex_symbol` overrides.
    ///
    /// # Errors
    /// Returns [`PatternError::Grammar`] when an override does not produce a
    /// valid regular expression.
    pub fn new(options: &MatchOptions) -> Result<Self, PatternError> {
        let keyword = options
            .gherkin_definition_part
            .clone()
            .unwrap_or_else(|| options.keywords.definition_alternation());
        let tail = options.step_regex_symbol.as_deref().map_or_else(
            || r#"(?P<delim>/|'|"|`)(?P<rest>.+)$"#.to_owned(),
            |symbol| format!("(?P<delim>{symbol})(?P<body>[^{symbol}]+){symbol}"),
        );
        let source = format!(r#"^(?P<prefix>(?:[^'"/]*?[^\w])|)(?P<keyword>{keyword})[^/'"`\w]*?{tail}"#);
        RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map(|regex| Self { regex })
            .map_err(|source| PatternError::Grammar {
                grammar: "step definition",
                source,
            })
    }

    /// Match a single (possibly joined) source line.
    #[must_use]
    pub fn find<'t>(&self, line: &'t str) -> Option<DefinitionMatch<'t>> {
        let caps = self.regex.captures(line)?;
        let prefix = caps.name("prefix").map_or("", |m| m.as_str());
        let keyword = caps.name("keyword")?.as_str();
        let body = caps
            .name("body")
            .map(|m| m.as_str())
            .or_else(|| delimited_body(&caps))?;
        Some(DefinitionMatch {
            column: prefix.chars().count(),
            keyword,
            body,
        })
    }
}

/// The body runs to the last occurrence of the opening delimiter.
fn delimited_body<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    let delim = caps.name("delim")?.as_str();
    let rest = caps.name("rest")?.as_str();
    let end = rest.rfind(delim)?;
    rest.get(..end).filter(|body| !body.is_empty())
}

/// Pieces of a matched definition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionMatch<'t> {
    /// Char offset of the keyword.
    pub column: usize,
    /// The keyword as written.
    pub keyword: &'t str,
    /// Text between the delimiters.
    pub body: &'t str,
}

/// One step definition found in a source file, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDefinition {
    /// Zero-based line of the keyword.
    pub line: usize,
    /// Char offset of the keyword within the line.
    pub column: usize,
    /// Classification of the keyword.
    pub kind: GherkinKind,
    /// Whole definition line(s) after custom-parameter substitution.
    pub source_line: String,
    /// Step body after custom-parameter substitution.
    pub pattern: String,
    /// Step body as written.
    pub original_text: String,
    /// Block comment directly preceding the definition.
    pub comment: Option<String>,
}

/// Scan `text` for step definitions in source order.
///
/// Block comments are attached to the definition on the line following
/// their closing line. A line that does not match on its own is retried
/// joined with the next line, provided the next line does not match alone.
#[must_use]
pub fn scan_definitions(
    grammar: &DefinitionGrammar,
    keywords: &KeywordTable,
    parameters: &CustomParameterMap,
    text: &str,
) -> Vec<RawDefinition> {
    let mut comments = collect_block_comments(text);
    let cleared = clear_comments(text);
    let lines: Vec<&str> = cleared.lines().collect();
    let mut definitions = Vec::new();

    for (index, raw_line) in lines.iter().enumerate() {
        let next_raw = lines.get(index.saturating_add(1)).copied().unwrap_or("");
        let current = parameters.substitute(raw_line);
        let (source_line, raw_source) = if grammar.find(&current).is_some() {
            (current, (*raw_line).to_owned())
        } else {
            let next = parameters.substitute(next_raw);
            let joined = format!("{current}{next}");
            if next.is_empty() || grammar.find(&next).is_some() || grammar.find(&joined).is_none() {
                continue;
            }
            (joined, format!("{raw_line}{next_raw}"))
        };
        let Some(found) = grammar.find(&source_line) else {
            continue;
        };
        let original_text = grammar
            .find(&raw_source)
            .map_or(found.body, |raw| raw.body)
            .to_owned();
        let column = found.column;
        let kind = keywords.classify(found.keyword);
        let pattern = found.body.to_owned();
        definitions.push(RawDefinition {
            line: index,
            column,
            kind,
            source_line,
            pattern,
            original_text,
            comment: comments.remove(&index),
        });
    }
    definitions
}

/// Block comments keyed by the line following their closing line.
///
/// A line starting with `/*` opens a block and a line starting with `*/`
/// closes it. A block opened and closed on the same line is complete at
/// once.
#[must_use]
pub fn collect_block_comments(text: &str) -> HashMap<usize, String> {
    let mut comments = HashMap::new();
    let mut current = String::new();
    let mut open = false;

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("/*") {
            current = format!("{line}\n");
            open = !rest.contains("*/");
            if !open {
                comments.insert(index.saturating_add(1), std::mem::take(&mut current));
            }
        } else if trimmed.starts_with("*/") && open {
            current.push_str(line);
            current.push('\n');
            comments.insert(index.saturating_add(1), std::mem::take(&mut current));
            open = false;
        } else if open {
            current.push_str(line);
            current.push('\n');
        }
    }
    comments
}

/// Blank out line-leading block comments and whole-line `//` comments.
///
/// The line count is preserved so positions in the result map directly onto
/// the input. Text following a closing `*/` is kept.
#[must_use]
pub fn clear_comments(text: &str) -> String {
    let mut in_block = false;
    let mut cleared: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if in_block {
            match line.split_once("*/") {
                Some((_, after)) => {
                    in_block = false;
                    cleared.push(after);
                }
                None => cleared.push(""),
            }
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            match rest.split_once("*/") {
                Some((_, after)) => cleared.push(after),
                None => {
                    in_block = true;
                    cleared.push("");
                }
            }
        } else if trimmed.starts_with("//") {
            cleared.push("");
        } else {
            cleared.push(line);
        }
    }
    cleared.join("\n")
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail loudly on invalid grammars")]
mod tests {
    use super::*;
    use crate::custom::CustomParameter;
    use rstest::{fixture, rstest};

    #[fixture]
    fn grammar() -> DefinitionGrammar {
        DefinitionGrammar::new(&MatchOptions::default()).expect("default grammar compiles")
    }

    fn scan(grammar: &DefinitionGrammar, text: &str) -> Vec<RawDefinition> {
        scan_definitions(grammar, &KeywordTable::default(), &CustomParameterMap::default(), text)
    }

    #[rstest]
    #[case(r"Given(/^I have (\d+) cats$/, function (n) {", 0, "Given", r"^I have (\d+) cats$")]
    #[case("  When('I log in', () => {", 2, "When", "I log in")]
    #[case(r#"@Then("the \"title\" is shown")"#, 1, "Then", r#"the \"title\" is shown"#)]
    #[case("this.defineStep(`I wait`, async () => {})", 5, "defineStep", "I wait")]
    #[case("  @given('I open it')", 3, "given", "I open it")]
    fn matches_definition_lines(
        grammar: DefinitionGrammar,
        #[case] line: &str,
        #[case] column: usize,
        #[case] keyword: &str,
        #[case] body: &str,
    ) {
        let found = grammar.find(line).expect("line should match");
        assert_eq!(found.column, column);
        assert_eq!(found.keyword, keyword);
        assert_eq!(found.body, body);
    }

    #[rstest]
    #[case("const Given = require('x');")]
    #[case("Forgiven('nope')")]
    #[case("Given('')")]
    #[case("just text")]
    fn rejects_non_definitions(grammar: DefinitionGrammar, #[case] line: &str) {
        assert!(grammar.find(line).is_none(), "{line:?} should not match");
    }

    #[test]
    fn honours_delimiter_override() {
        let options = MatchOptions {
            step_regex_symbol: Some("'".to_owned()),
            ..MatchOptions::default()
        };
        let grammar = DefinitionGrammar::new(&options).expect("override compiles");
        let found = grammar.find(r#"Given('a "b" c', x => 'y')"#).expect("line should match");
        assert_eq!(found.body, r#"a "b" c"#);
        assert!(grammar.find("Given(/regex/)").is_none());
    }

    #[test]
    fn honours_keyword_override() {
        let options = MatchOptions {
            gherkin_definition_part: Some("(step)".to_owned()),
            ..MatchOptions::default()
        };
        let grammar = DefinitionGrammar::new(&options).expect("override compiles");
        assert!(grammar.find("Given('a')").is_none());
        assert_eq!(grammar.find("@Step('a')").map(|m| m.body), Some("a"));
    }

    #[test]
    fn reports_invalid_override() {
        let options = MatchOptions {
            gherkin_definition_part: Some("(unclosed".to_owned()),
            ..MatchOptions::default()
        };
        let err = DefinitionGrammar::new(&options).expect_err("override is invalid");
        assert!(err.to_string().starts_with("invalid step definition grammar"));
    }

    #[rstest]
    fn scans_definitions_in_order(grammar: DefinitionGrammar) {
        let text = "Given('one', () => {});\n\nWhen(/two/, () => {});\nAnd(\"three\")\n";
        let found: Vec<(usize, GherkinKind, String)> = scan(&grammar, text)
            .into_iter()
            .map(|d| (d.line, d.kind, d.pattern))
            .collect();
        assert_eq!(
            found,
            vec![
                (0, GherkinKind::Given, "one".to_owned()),
                (2, GherkinKind::When, "two".to_owned()),
                (3, GherkinKind::And, "three".to_owned()),
            ]
        );
    }

    #[rstest]
    fn joins_two_line_definitions(grammar: DefinitionGrammar) {
        let text = "Given(\n'I am split', () => {});";
        let found = scan(&grammar, text);
        assert_eq!(found.len(), 1);
        let definition = found.first().expect("one definition");
        assert_eq!(definition.line, 0);
        assert_eq!(definition.pattern, "I am split");
    }

    #[rstest]
    fn skips_commented_definitions(grammar: DefinitionGrammar) {
        let text = "// Given('hidden')\n/*\nWhen('hidden too')\n*/\nThen('shown')";
        let found = scan(&grammar, text);
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|d| d.line), Some(4));
    }

    #[rstest]
    fn attaches_preceding_block_comment(grammar: DefinitionGrammar) {
        let text = "/**\n * Logs in\n */\nGiven('I log in')\n/** inline */\nWhen('I wait')\nThen('bare')";
        let found = scan(&grammar, text);
        let comments: Vec<Option<&str>> = found.iter().map(|d| d.comment.as_deref()).collect();
        assert_eq!(
            comments,
            vec![Some("/**\n * Logs in\n */\n"), Some("/** inline */\n"), None]
        );
    }

    #[test]
    fn stray_block_close_attaches_nothing() {
        let comments = collect_block_comments("x = 1;\n */\nGiven('a')\n/* one */\nWhen('b')");
        assert_eq!(comments.len(), 1);
        assert_eq!(comments.get(&4).map(String::as_str), Some("/* one */\n"));
    }

    #[rstest]
    fn keeps_original_text_before_substitution(grammar: DefinitionGrammar) {
        let parameters =
            CustomParameterMap::new([CustomParameter::literal("{color}", "(red|blue)")]);
        let found = scan_definitions(
            &grammar,
            &KeywordTable::default(),
            &parameters,
            "Given('I pick {color}', () => {})",
        );
        let definition = found.first().expect("one definition");
        assert_eq!(definition.pattern, "I pick (red|blue)");
        assert_eq!(definition.original_text, "I pick {color}");
        assert_eq!(definition.source_line, "Given('I pick (red|blue)', () => {})");
    }

    #[test]
    fn clearing_comments_preserves_line_count() {
        let text = "a\n/* x\ny\n*/ b\n  // c\nd";
        let cleared = clear_comments(text);
        assert_eq!(cleared, "a\n\n\n b\n\nd");
        assert_eq!(cleared.lines().count(), text.lines().count());
    }
}
