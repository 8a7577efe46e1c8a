//! Handler for `textDocument/definition` requests.
//!
//! Navigates from a feature step line to the step definition it matches.

use async_lsp::ResponseError;
use lsp_types::{GotoDefinitionParams, GotoDefinitionResponse, Location, Position, Range, Url};
use stepscope_patterns::DefinitionLocation;
use tracing::debug;

use crate::server::ServerState;
use crate::util::{char_col_to_utf16_col, line_at, to_u32};

use super::document_text;

/// Handle `textDocument/definition` requests.
///
/// Returns the location of the step definition matching the line under the
/// cursor, or `None` when the line is not a step line or nothing matches.
///
/// # Errors
///
/// Currently always returns `Ok`; lookup failures are logged.
pub fn handle_definition(
    state: &ServerState,
    params: &GotoDefinitionParams,
) -> Result<Option<GotoDefinitionResponse>, ResponseError> {
    let uri = &params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    let catalog = match state.catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            debug!(error = %err, "ignoring definition request");
            return Ok(None);
        }
    };
    let Some(text) = document_text(state, uri) else {
        return Ok(None);
    };
    let Some(line) = line_at(&text, position.line) else {
        return Ok(None);
    };
    let Some(location) = catalog.definition(line, &text) else {
        debug!(line, "no step definition matches");
        return Ok(None);
    };
    Ok(to_lsp_location(&location).map(GotoDefinitionResponse::Scalar))
}

/// Convert an engine location into a protocol location.
///
/// The definition file is read to convert the char column; when it cannot
/// be read the column is used as is.
fn to_lsp_location(location: &DefinitionLocation) -> Option<Location> {
    let Ok(uri) = Url::from_file_path(&location.path) else {
        debug!(path = %location.path.display(), "cannot convert path to URI");
        return None;
    };
    let line = to_u32(location.line);
    let character = std::fs::read_to_string(&location.path)
        .ok()
        .and_then(|source| {
            line_at(&source, line).map(|text| char_col_to_utf16_col(text, location.character))
        })
        .unwrap_or_else(|| to_u32(location.character));
    let position = Position::new(line, character);
    Some(Location {
        uri,
        range: Range::new(position, position),
    })
}
