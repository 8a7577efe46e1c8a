//! Step-pattern compilation and matching for Gherkin editors.
//!
//! The crate turns loosely written step definitions (regular expressions,
//! Cucumber expressions, optional and alternative text, custom named
//! parameters) into a uniform family of matchers, and answers the questions
//! an editor asks of a feature file: does this line match a step, where was
//! that step declared, and what could complete it.
//!
//! Everything is synchronous and works on text handed in by the caller.
//! [`StepCatalog`] is the usual entry point; the individual stages are
//! exported for callers that need them separately.
//!
//! ```
//! use stepscope_patterns::{MatchOptions, StepCatalog};
//!
//! let catalog = StepCatalog::new(MatchOptions::default()).expect("default grammars");
//! catalog.rescan([("steps.js", "Given('I have {int} cats', () => {});")]);
//! assert!(catalog.validate("  Given I have 3 cats", 0, "").is_none());
//! assert!(catalog.validate("  Given I have no cats", 0, "").is_some());
//! ```

mod catalog;
mod completion;
mod custom;
mod definition;
mod docs;
mod errors;
mod keyword;
mod line;
mod options;
mod pattern;
mod registry;
mod step;

pub use catalog::{StepCatalog, StepDiagnostic};
pub use completion::{CompletionCandidate, CompletionKind, STEP_SORT_PREFIX, compose_insert_text};
pub use custom::{
    CustomParameter, CustomParameterMap, ParameterToken, custom_placeholders,
    unique_custom_placeholders,
};
pub use definition::{
    DefinitionGrammar, DefinitionMatch, RawDefinition, clear_comments, collect_block_comments,
    scan_definitions,
};
pub use docs::{
    CommentParser, CommentTag, JsDocParser, ParsedComment, assemble_documentation,
    comment_description,
};
pub use errors::PatternError;
pub use keyword::{GherkinKind, GherkinKindParseError, KeywordTable};
pub use line::{LineResolver, ResolvedLine, outline_values};
pub use options::MatchOptions;
pub use pattern::{
    Matcher, build_prefix_pattern, expand_invariants, normalize_step_pattern,
    split_pattern_tokens,
};
pub use registry::StepRegistry;
pub use step::{DefinitionLocation, Step, StepBuilder, display_text, step_description, step_id};
