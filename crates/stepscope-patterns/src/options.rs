//! Immutable engine configuration.

use crate::custom::CustomParameterMap;
use crate::keyword::KeywordTable;

/// Behaviour switches and tables read by the engine components.
///
/// Built once from editor settings and handed to
/// [`StepCatalog::new`](crate::StepCatalog::new); the engine never consults
/// any other source of configuration.
#[derive(Debug, Clone, Default)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag mirrors an independent editor setting"
)]
pub struct MatchOptions {
    /// Register one step per alternation variant of a definition.
    pub expand_invariants: bool,
    /// Offer only steps declared under the line's effective keyword.
    pub strict_gherkin_completion: bool,
    /// Accept only steps declared under the line's effective keyword.
    pub strict_gherkin_validation: bool,
    /// Turn capture-like fragments of inserted text into snippet stops.
    pub smart_snippets: bool,
    /// Fill snippet stops with configured custom-parameter choices.
    pub custom_parameters_autocomplete: bool,
    /// Text placed on both sides of a choice snippet.
    pub wrap_snippets_in: String,
    /// Replacement for the keyword group of the definition grammar.
    pub gherkin_definition_part: Option<String>,
    /// Replacement for the quoting character of the definition grammar.
    pub step_regex_symbol: Option<String>,
    /// Keyword spellings recognised in features and definitions.
    pub keywords: KeywordTable,
    /// Configured custom parameters.
    pub custom_parameters: CustomParameterMap,
}

impl MatchOptions {
    /// The same options without user-supplied definition grammar overrides.
    #[must_use]
    pub fn without_grammar_overrides(&self) -> Self {
        Self {
            gherkin_definition_part: None,
            step_regex_symbol: None,
            ..self.clone()
        }
    }
}
