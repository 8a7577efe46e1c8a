//! Unmatched-step diagnostics and their publication.

use async_lsp::lsp_types::notification;
use lsp_types::{Diagnostic, DiagnosticSeverity, Position, PublishDiagnosticsParams, Range, Url};
use stepscope_patterns::{StepCatalog, StepDiagnostic};
use tracing::{debug, warn};

use crate::server::ServerState;
use crate::util::{char_col_to_utf16_col, line_at, to_u32};

/// Source label attached to every diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "stepscope";

/// Diagnostics for every step line of `text` that no step matches.
#[must_use]
pub fn compute_step_diagnostics(catalog: &StepCatalog, text: &str) -> Vec<Diagnostic> {
    catalog
        .validate_document(text)
        .into_iter()
        .map(|diagnostic| to_lsp_diagnostic(text, diagnostic))
        .collect()
}

fn to_lsp_diagnostic(text: &str, diagnostic: StepDiagnostic) -> Diagnostic {
    let line_number = to_u32(diagnostic.line);
    let line = line_at(text, line_number).unwrap_or("");
    Diagnostic {
        range: Range::new(
            Position::new(line_number, char_col_to_utf16_col(line, diagnostic.start)),
            Position::new(line_number, char_col_to_utf16_col(line, diagnostic.end)),
        ),
        severity: Some(DiagnosticSeverity::WARNING),
        source: Some(DIAGNOSTIC_SOURCE.to_owned()),
        message: diagnostic.message,
        ..Diagnostic::default()
    }
}

/// Publish diagnostics for one open feature document.
///
/// An empty list is published when every step matches, clearing earlier
/// diagnostics.
pub fn publish_feature_diagnostics(state: &ServerState, uri: &Url) {
    let Some(client) = state.client() else {
        debug!("no client socket available for publishing diagnostics");
        return;
    };
    let Some(text) = state.document(uri) else {
        debug!(%uri, "no open document for diagnostics");
        return;
    };
    let catalog = match state.catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            debug!(error = %err, "skipping diagnostics");
            return;
        }
    };

    let diagnostics = compute_step_diagnostics(catalog, text);
    let params = PublishDiagnosticsParams::new(uri.clone(), diagnostics, None);
    if let Err(err) = client.notify::<notification::PublishDiagnostics>(params) {
        warn!(error = %err, "failed to publish feature diagnostics");
    }
}

/// Publish diagnostics for every open document.
///
/// Called after the step catalog changed.
pub fn publish_all_feature_diagnostics(state: &ServerState) {
    for uri in state.open_documents() {
        publish_feature_diagnostics(state, uri);
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use stepscope_patterns::MatchOptions;

    #[test]
    fn converts_ranges_to_utf16() {
        let catalog = StepCatalog::new(MatchOptions::default()).expect("default grammars");
        catalog.rescan([("steps.js", "Given('a café exists', () => {});")]);
        let text = "Feature: f\n  Given a café exists\n  When 😀 happens   \n";
        let diagnostics = compute_step_diagnostics(&catalog, text);
        let [diagnostic] = diagnostics.as_slice() else {
            panic!("expected one diagnostic, got {diagnostics:?}");
        };
        assert_eq!(diagnostic.range.start, Position::new(2, 2));
        assert_eq!(diagnostic.range.end, Position::new(2, 17));
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diagnostic.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
        assert_eq!(diagnostic.message, "Was unable to find step for \"When 😀 happens\"");
    }

    #[test]
    fn publishing_without_client_is_a_no_op() {
        let state = ServerState::new(crate::config::ServerConfig::default());
        let uri = Url::parse("file:///ws/a.feature").expect("uri");
        publish_feature_diagnostics(&state, &uri);
        publish_all_feature_diagnostics(&state);
    }
}
