//! Compiled step records.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::custom::unique_custom_placeholders;
use crate::definition::RawDefinition;
use crate::docs::{CommentParser, assemble_documentation, comment_description};
use crate::keyword::GherkinKind;
use crate::options::MatchOptions;
use crate::pattern::{
    Matcher, build_prefix_pattern, expand_invariants, normalize_step_pattern,
};

/// Where a step definition was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefinitionLocation {
    /// Source file of the definition.
    pub path: PathBuf,
    /// Zero-based line of the keyword.
    pub line: usize,
    /// Char offset of the keyword.
    pub character: usize,
}

/// One entry of the step catalog.
#[derive(Debug)]
pub struct Step {
    id: String,
    original_text: String,
    pattern_text: String,
    full: Matcher,
    partial: Matcher,
    display_text: String,
    description: String,
    location: DefinitionLocation,
    usage: AtomicUsize,
    kind: GherkinKind,
    documentation: String,
}

impl Step {
    /// Stable identity derived from the display text.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The definition body as written, before custom parameters were
    /// substituted.
    #[must_use]
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// The variant this step was compiled from, before normalisation.
    #[must_use]
    pub fn pattern_text(&self) -> &str {
        &self.pattern_text
    }

    /// Whether a complete step line is accepted.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.full.is_match(text)
    }

    /// Whether `text` is consistent with eventually completing to this step.
    #[must_use]
    pub fn matches_prefix(&self, text: &str) -> bool {
        self.partial.is_match(text)
    }

    /// Matcher for complete lines.
    #[must_use]
    pub fn full_matcher(&self) -> &Matcher {
        &self.full
    }

    /// Matcher for lines still being typed.
    #[must_use]
    pub fn partial_matcher(&self) -> &Matcher {
        &self.partial
    }

    /// Human-facing canonical text.
    #[must_use]
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// The definition line up to its body.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Where the step was declared.
    #[must_use]
    pub fn location(&self) -> &DefinitionLocation {
        &self.location
    }

    /// How often the step has been used or accepted as a completion.
    #[must_use]
    pub fn usage(&self) -> usize {
        self.usage.load(Ordering::Relaxed)
    }

    pub(crate) fn record_usage(&self) {
        self.usage.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_usage(&self, count: usize) {
        self.usage.store(count, Ordering::Relaxed);
    }

    /// Keyword the definition was declared under.
    #[must_use]
    pub fn kind(&self) -> GherkinKind {
        self.kind
    }

    /// Rendered documentation.
    #[must_use]
    pub fn documentation(&self) -> &str {
        &self.documentation
    }
}

/// Strip escapes and anchors from pattern text.
///
/// # Examples
/// ```
/// use stepscope_patterns::display_text;
///
/// assert_eq!(display_text(r"^I go to \/home$"), "I go to /home");
/// ```
#[must_use]
pub fn display_text(pattern: &str) -> String {
    let text = pattern.replace('\\', "");
    let text = text.strip_prefix('^').unwrap_or(&text);
    text.strip_suffix('$').unwrap_or(text).to_owned()
}

/// Identity of a step with the given display text.
#[must_use]
pub fn step_id(display_text: &str) -> String {
    format!("step{}", hex::encode(Sha256::digest(display_text.as_bytes())))
}

/// The definition line up to the start of its body block.
#[must_use]
pub fn step_description(source_line: &str) -> String {
    source_line
        .split_once('{')
        .map_or(source_line, |(head, _)| head)
        .trim()
        .to_owned()
}

/// Turns scanned definitions into compiled [`Step`]s.
#[derive(Debug, Clone, Copy)]
pub struct StepBuilder<'a> {
    options: &'a MatchOptions,
    comments: &'a dyn CommentParser,
}

impl<'a> StepBuilder<'a> {
    /// A builder reading `options` and parsing comments with `comments`.
    #[must_use]
    pub fn new(options: &'a MatchOptions, comments: &'a dyn CommentParser) -> Self {
        Self { options, comments }
    }

    /// Compile every variant of `definition` declared in `path`.
    ///
    /// Variants whose normalised form does not compile are logged and
    /// skipped. A variant whose prefix form does not compile uses its full
    /// matcher for prefix tests.
    #[must_use]
    pub fn build(&self, path: &Path, definition: &RawDefinition) -> Vec<Step> {
        let variants = if self.options.expand_invariants {
            expand_invariants(&definition.pattern)
        } else {
            vec![definition.pattern.clone()]
        };
        let documentation = self.documentation(definition);
        let description = step_description(&definition.source_line);
        let location = DefinitionLocation {
            path: path.to_path_buf(),
            line: definition.line,
            character: definition.column,
        };

        variants
            .iter()
            .filter_map(|variant| {
                let normalized = normalize_step_pattern(variant);
                let full = Matcher::new(&normalized)
                    .inspect_err(|err| {
                        debug!(path = %path.display(), line = definition.line, error = %err, "discarding step pattern");
                    })
                    .ok()?;
                let partial = Matcher::new(&build_prefix_pattern(&normalized)).unwrap_or_else(|err| {
                    debug!(path = %path.display(), line = definition.line, error = %err, "using full matcher for prefix tests");
                    full.clone()
                });
                let display = display_text(variant);
                Some(Step {
                    id: step_id(&display),
                    original_text: definition.original_text.clone(),
                    pattern_text: variant.clone(),
                    full,
                    partial,
                    display_text: display,
                    description: description.clone(),
                    location: location.clone(),
                    usage: AtomicUsize::new(0),
                    kind: definition.kind,
                    documentation: documentation.clone(),
                })
            })
            .collect()
    }

    fn documentation(&self, definition: &RawDefinition) -> String {
        let description = definition.comment.as_deref().map_or_else(
            || definition.original_text.clone(),
            |comment| comment_description(self.comments, comment),
        );
        let parameters: Vec<(String, String)> = unique_custom_placeholders(&definition.original_text)
            .iter()
            .filter_map(|token| self.options.custom_parameters.get(token))
            .filter_map(|parameter| {
                parameter
                    .documentation
                    .as_ref()
                    .map(|docs| (parameter.token.key().to_owned(), docs.clone()))
            })
            .collect();
        assemble_documentation(&description, &parameters)
    }
}
