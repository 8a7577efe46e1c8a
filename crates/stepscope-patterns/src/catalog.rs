//! The step catalog and the queries an editor asks of it.
//!
//! A [`StepCatalog`] owns the compiled grammars and the current
//! [`StepRegistry`]. Rescans build a complete registry off to the side and
//! publish it with a single pointer swap, so queries always observe either
//! the previous catalog or the new one.

use std::path::Path;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use regex::Regex;
use tracing::{debug, info};

use crate::completion::{CompletionCandidate, compose_insert_text};
use crate::custom::CustomParameter;
use crate::definition::{DefinitionGrammar, scan_definitions};
use crate::docs::{CommentParser, JsDocParser};
use crate::errors::PatternError;
use crate::line::{LineResolver, ResolvedLine};
use crate::options::MatchOptions;
use crate::registry::StepRegistry;
use crate::step::{DefinitionLocation, StepBuilder};

static LAST_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+$").unwrap_or_else(|_| unreachable!()));

/// A feature line no step matches.
///
/// Positions are zero-based; `start` and `end` are char offsets within
/// `line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDiagnostic {
    /// Line of the unmatched step.
    pub line: usize,
    /// Column of the keyword.
    pub start: usize,
    /// End of the line without trailing whitespace.
    pub end: usize,
    /// Human-readable message.
    pub message: String,
}

/// Compiled step definitions plus the grammars used to query them.
#[derive(Debug)]
pub struct StepCatalog {
    options: MatchOptions,
    grammar: DefinitionGrammar,
    resolver: LineResolver,
    comments: Box<dyn CommentParser>,
    registry: RwLock<Arc<StepRegistry>>,
}

impl StepCatalog {
    /// An empty catalog configured by `options`.
    ///
    /// # Errors
    /// Returns [`PatternError::Grammar`] when the definition or feature-line
    /// grammar derived from `options` does not compile.
    pub fn new(options: MatchOptions) -> Result<Self, PatternError> {
        let grammar = DefinitionGrammar::new(&options)?;
        let resolver = LineResolver::new(&options.keywords)?;
        Ok(Self {
            options,
            grammar,
            resolver,
            comments: Box::new(JsDocParser),
            registry: RwLock::new(Arc::new(StepRegistry::new())),
        })
    }

    /// Replace the parser used for definition comments.
    #[must_use]
    pub fn with_comment_parser(mut self, parser: impl CommentParser + 'static) -> Self {
        self.comments = Box::new(parser);
        self
    }

    /// The options the catalog was built with.
    #[must_use]
    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Snapshot of the current registry.
    #[must_use]
    pub fn registry(&self) -> Arc<StepRegistry> {
        let guard = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Rebuild the registry from `(path, text)` pairs of definition sources.
    ///
    /// Sources are processed in the order given; within a file definitions
    /// keep their source order. Usage counts of steps that survive the
    /// rescan are carried over. Returns the number of registered steps.
    pub fn rescan<I, P, S>(&self, sources: I) -> usize
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let builder = StepBuilder::new(&self.options, self.comments.as_ref());
        let mut next = StepRegistry::new();
        let mut files = 0usize;
        for (path, text) in sources {
            let path = path.as_ref();
            files = files.saturating_add(1);
            let definitions = scan_definitions(
                &self.grammar,
                &self.options.keywords,
                &self.options.custom_parameters,
                text.as_ref(),
            );
            for definition in &definitions {
                for step in builder.build(path, definition) {
                    let id = step.id().to_owned();
                    if !next.register(step) {
                        debug!(path = %path.display(), line = definition.line, %id, "dropping duplicate step");
                    }
                }
            }
        }
        next.inherit_usage(&self.registry());
        let steps = next.len();
        *self.registry.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        info!(files, steps, "rebuilt step catalog");
        steps
    }

    /// Recount step usage from feature documents.
    ///
    /// All counters are zeroed, then every line of every document that
    /// resolves to a step increments that step. Returns the number of
    /// matched lines.
    pub fn sync_usage<I, S>(&self, documents: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = self.registry();
        registry.reset_usage();
        let mut matched = 0usize;
        for document in documents {
            let document = document.as_ref();
            for line in document.lines() {
                let step = self
                    .resolver
                    .resolve(line, document, &registry)
                    .and_then(|resolved| registry.lookup(&resolved.text, None));
                if let Some(step) = step {
                    registry.record_usage(step.id());
                    matched = matched.saturating_add(1);
                }
            }
        }
        debug!(matched, "synchronised step usage");
        matched
    }

    /// Split a feature line into keyword and step text.
    #[must_use]
    pub fn resolve_line(&self, line: &str, document: &str) -> Option<ResolvedLine> {
        self.resolver.resolve(line, document, &self.registry())
    }

    /// Check one feature line.
    ///
    /// Lines that are not step lines, and step lines some step matches,
    /// produce nothing. With strict validation only steps declared under
    /// the line's effective keyword count.
    #[must_use]
    pub fn validate(&self, line: &str, line_number: usize, document: &str) -> Option<StepDiagnostic> {
        let registry = self.registry();
        let line = line.trim_end();
        let resolved = self.resolver.resolve(line, document, &registry)?;
        let kind = self.options.strict_gherkin_validation.then(|| {
            self.resolver
                .strict_kind(resolved.kind, line_number, document, &registry)
        });
        if registry.lookup(&resolved.text, kind).is_some() {
            return None;
        }
        Some(StepDiagnostic {
            line: line_number,
            start: resolved.indent,
            end: line.chars().count(),
            message: format!("Was unable to find step for \"{}\"", line.trim_start()),
        })
    }

    /// Check every line of `document`.
    #[must_use]
    pub fn validate_document(&self, document: &str) -> Vec<StepDiagnostic> {
        document
            .lines()
            .enumerate()
            .filter_map(|(number, line)| self.validate(line, number, document))
            .collect()
    }

    /// Where the step matching `line` was declared.
    #[must_use]
    pub fn definition(&self, line: &str, document: &str) -> Option<DefinitionLocation> {
        let registry = self.registry();
        let resolved = self.resolver.resolve(line, document, &registry)?;
        registry
            .lookup(&resolved.text, None)
            .map(|step| step.location().clone())
    }

    /// Completions for `line` with the cursor at `character`.
    ///
    /// When the cursor sits inside a configured custom parameter that has
    /// autocomplete values, those values are offered. Otherwise every step
    /// consistent with the line minus its last, possibly incomplete, word is
    /// offered with the text still to be inserted. Returns `None` when the
    /// line is not a step line or nothing applies.
    #[must_use]
    pub fn completions(
        &self,
        line: &str,
        line_number: usize,
        character: usize,
        document: &str,
    ) -> Option<Vec<CompletionCandidate>> {
        let registry = self.registry();
        let resolved = self.resolver.resolve(line, document, &registry)?;

        if let Some(parameter) = self
            .highlighted_custom_parameter(line, character)
            .filter(|parameter| !parameter.autocomplete.is_empty())
        {
            return Some(
                parameter
                    .autocomplete
                    .iter()
                    .map(|value| CompletionCandidate::value(value, parameter.documentation.as_deref()))
                    .collect(),
            );
        }

        let typed = LAST_WORD_RE.replace(&resolved.text, "");
        let kind = self.options.strict_gherkin_completion.then(|| {
            self.resolver
                .strict_kind(resolved.kind, line_number, document, &registry)
        });
        let candidates: Vec<CompletionCandidate> = registry
            .steps()
            .iter()
            .filter(|step| kind.is_none_or(|kind| step.kind() == kind))
            .filter(|step| step.matches_prefix(&typed))
            .map(|step| {
                let source = if self.options.custom_parameters_autocomplete {
                    step.original_text()
                } else {
                    step.pattern_text()
                };
                CompletionCandidate::step(step, compose_insert_text(&self.options, source, &typed))
            })
            .collect();
        (!candidates.is_empty()).then_some(candidates)
    }

    /// Record that the completion for step `id` was accepted.
    pub fn resolve_completion(&self, id: &str) -> bool {
        self.registry().record_usage(id)
    }

    /// The configured custom parameter surrounding `character` in `line`.
    #[must_use]
    pub fn highlighted_custom_parameter(&self, line: &str, character: usize) -> Option<&CustomParameter> {
        self.options
            .custom_parameters
            .highlighted_parameter(line, character)
    }
}
