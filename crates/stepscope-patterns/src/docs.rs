//! Step documentation assembled from definition comments and custom
//! parameters.

use std::fmt;

/// A tagged field of a documentation comment, such as `@desc text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTag {
    /// Tag name without the leading `@`.
    pub title: String,
    /// Text following the tag name.
    pub description: String,
}

/// Free description plus tagged fields extracted from a comment block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedComment {
    /// Text before the first tag.
    pub description: String,
    /// Tags in order of appearance.
    pub tags: Vec<CommentTag>,
}

impl ParsedComment {
    /// Description of the first tag titled `title`.
    #[must_use]
    pub fn tag(&self, title: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.title == title)
            .map(|tag| tag.description.as_str())
    }
}

/// Extracts a description and tagged fields from a raw comment block.
pub trait CommentParser: Send + Sync + fmt::Debug {
    /// Parse `raw`, which still carries its comment delimiters.
    fn parse(&self, raw: &str) -> ParsedComment;
}

/// Parser for `/** ... */` comments with `@tag` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsDocParser;

impl CommentParser for JsDocParser {
    fn parse(&self, raw: &str) -> ParsedComment {
        let mut description: Vec<&str> = Vec::new();
        let mut tags: Vec<(String, Vec<&str>)> = Vec::new();

        for line in raw.trim().lines().map(unwrap_comment_line) {
            if let Some(tagged) = line.strip_prefix('@') {
                let (title, rest) = tagged
                    .split_once(char::is_whitespace)
                    .unwrap_or((tagged, ""));
                tags.push((title.to_owned(), vec![rest.trim()]));
            } else if let Some((_, body)) = tags.last_mut() {
                body.push(line);
            } else {
                description.push(line);
            }
        }

        ParsedComment {
            description: description.join("\n").trim().to_owned(),
            tags: tags
                .into_iter()
                .map(|(title, body)| CommentTag {
                    title,
                    description: body.join("\n").trim().to_owned(),
                })
                .collect(),
        }
    }
}

fn unwrap_comment_line(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("/**")
        .or_else(|| line.strip_prefix("/*"))
        .unwrap_or(line);
    let line = line.strip_suffix("*/").unwrap_or(line).trim_end();
    let line = line.strip_prefix('*').unwrap_or(line);
    line.strip_prefix(' ').unwrap_or(line)
}

/// The description a comment contributes to step documentation.
///
/// Prefers the free description, then an `@description` tag, then an
/// `@desc` tag, and finally the raw comment itself.
///
/// # Examples
/// ```
/// use stepscope_patterns::{JsDocParser, comment_description};
///
/// let raw = "/**\n * @desc Logs the user in\n */";
/// assert_eq!(comment_description(&JsDocParser, raw), "Logs the user in");
/// ```
#[must_use]
pub fn comment_description(parser: &dyn CommentParser, raw: &str) -> String {
    let parsed = parser.parse(raw);
    if !parsed.description.is_empty() {
        return parsed.description;
    }
    ["description", "desc"]
        .into_iter()
        .filter_map(|title| parsed.tag(title))
        .find(|text| !text.is_empty())
        .map_or_else(|| raw.to_owned(), str::to_owned)
}

/// Render the documentation shown for a step.
///
/// `parameters` holds `(token, documentation)` pairs for the custom
/// parameters the definition references.
#[must_use]
pub fn assemble_documentation(description: &str, parameters: &[(String, String)]) -> String {
    let mut parts: Vec<String> = vec![
        "Step Definition\n".to_owned(),
        description.to_owned(),
        "\n\n".to_owned(),
    ];
    if !parameters.is_empty() {
        parts.push("Custom Parameters\n".to_owned());
        parts.extend(
            parameters
                .iter()
                .map(|(token, documentation)| format!("{token}: {documentation}\n")),
        );
        parts.push("\n".to_owned());
    }
    parts.join("\n")
}
