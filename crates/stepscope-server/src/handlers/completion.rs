//! Handlers for `textDocument/completion` and `completionItem/resolve`.

use async_lsp::ResponseError;
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse, Documentation,
    InsertTextFormat,
};
use serde_json::{Value, json};
use stepscope_patterns::{CompletionCandidate, CompletionKind};
use tracing::debug;

use crate::server::ServerState;
use crate::util::{line_at, utf16_col_to_char_col};

use super::document_text;

/// Key under which a step completion carries its step id.
const STEP_ID_KEY: &str = "id";

/// Handle `textDocument/completion` requests.
///
/// # Errors
///
/// Currently always returns `Ok`; a missing catalog or document yields no
/// completions.
pub fn handle_completion(
    state: &ServerState,
    params: &CompletionParams,
) -> Result<Option<CompletionResponse>, ResponseError> {
    let uri = &params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;

    let catalog = match state.catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            debug!(error = %err, "ignoring completion request");
            return Ok(None);
        }
    };
    let Some(text) = document_text(state, uri) else {
        return Ok(None);
    };
    let Some(line) = line_at(&text, position.line) else {
        return Ok(None);
    };
    let line_number = usize::try_from(position.line).unwrap_or(usize::MAX);
    let character = utf16_col_to_char_col(line, position.character);

    let items: Option<Vec<CompletionItem>> = catalog
        .completions(line, line_number, character, &text)
        .map(|candidates| candidates.into_iter().map(to_completion_item).collect());
    Ok(items.map(CompletionResponse::Array))
}

/// Handle `completionItem/resolve` requests.
///
/// Accepting a step completion counts as one use of that step.
///
/// # Errors
///
/// Currently always returns `Ok` with the item unchanged.
pub fn handle_completion_resolve(
    state: &ServerState,
    item: CompletionItem,
) -> Result<CompletionItem, ResponseError> {
    let id = item
        .data
        .as_ref()
        .and_then(|data| data.get(STEP_ID_KEY))
        .and_then(Value::as_str);
    if let (Some(id), Ok(catalog)) = (id, state.catalog()) {
        if !catalog.resolve_completion(id) {
            debug!(id, "resolved completion for unknown step");
        }
    }
    Ok(item)
}

/// Convert an engine completion into a protocol completion item.
#[must_use]
pub fn to_completion_item(candidate: CompletionCandidate) -> CompletionItem {
    let (kind, format) = match candidate.kind {
        CompletionKind::Step => (CompletionItemKind::METHOD, InsertTextFormat::SNIPPET),
        CompletionKind::Value => (CompletionItemKind::VALUE, InsertTextFormat::PLAIN_TEXT),
    };
    CompletionItem {
        label: candidate.label,
        kind: Some(kind),
        documentation: candidate.documentation.map(Documentation::String),
        sort_text: candidate.sort_text,
        insert_text: Some(candidate.insert_text),
        insert_text_format: Some(format),
        data: candidate.id.map(|id| json!({ STEP_ID_KEY: id })),
        ..CompletionItem::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_candidates_become_snippets() {
        let item = to_completion_item(CompletionCandidate {
            label: "I add (d+) items".to_owned(),
            kind: CompletionKind::Step,
            id: Some("step42".to_owned()),
            documentation: Some("docs".to_owned()),
            sort_text: Some("AAA_I add (d+) items".to_owned()),
            insert_text: "add ${1:} items".to_owned(),
        });
        assert_eq!(item.kind, Some(CompletionItemKind::METHOD));
        assert_eq!(item.insert_text_format, Some(InsertTextFormat::SNIPPET));
        assert_eq!(item.insert_text.as_deref(), Some("add ${1:} items"));
        assert_eq!(item.sort_text.as_deref(), Some("AAA_I add (d+) items"));
        assert_eq!(item.data, Some(json!({ "id": "step42" })));
        assert_eq!(item.documentation, Some(Documentation::String("docs".to_owned())));
    }

    #[test]
    fn value_candidates_are_plain_text() {
        let item = to_completion_item(CompletionCandidate::value("red", None));
        assert_eq!(item.kind, Some(CompletionItemKind::VALUE));
        assert_eq!(item.insert_text_format, Some(InsertTextFormat::PLAIN_TEXT));
        assert!(item.data.is_none());
        assert!(item.documentation.is_none());
    }
}
