//! Text document notification handlers.
//!
//! Open feature documents are tracked with full-text sync and validated on
//! every change. Saving a step definition file rescans the catalog and
//! republishes diagnostics for every open feature document.

use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
};
use tracing::debug;

use crate::discovery::{is_feature_file, is_step_file};
use crate::server::ServerState;

use super::diagnostics::{publish_all_feature_diagnostics, publish_feature_diagnostics};

/// Handle `textDocument/didOpen` notifications.
pub fn handle_did_open_text_document(state: &mut ServerState, params: DidOpenTextDocumentParams) {
    let document = params.text_document;
    if !is_feature_uri(&document.uri) {
        return;
    }
    state.upsert_document(document.uri.clone(), document.text);
    publish_feature_diagnostics(state, &document.uri);
}

/// Handle `textDocument/didChange` notifications.
///
/// The server advertises full sync, so the last change carries the whole
/// document.
pub fn handle_did_change_text_document(
    state: &mut ServerState,
    params: DidChangeTextDocumentParams,
) {
    let uri = params.text_document.uri;
    if !is_feature_uri(&uri) {
        return;
    }
    let Some(change) = params.content_changes.into_iter().last() else {
        return;
    };
    state.upsert_document(uri.clone(), change.text);
    publish_feature_diagnostics(state, &uri);
}

/// Handle `textDocument/didSave` notifications.
///
/// A saved step definition file triggers a rescan. A saved feature file
/// refreshes usage counts when feature syncing is enabled.
pub fn handle_did_save_text_document(state: &mut ServerState, params: DidSaveTextDocumentParams) {
    let uri = params.text_document.uri;
    let Ok(path) = uri.to_file_path() else {
        debug!(%uri, "ignoring didSave for non-file URI");
        return;
    };
    let Some(root) = state.workspace_root() else {
        debug!("ignoring didSave before the workspace root is known");
        return;
    };

    if is_step_file(root, &state.settings().steps, &path) {
        let steps = state.rescan();
        debug!(path = %path.display(), steps, "rescanned after step file save");
        publish_all_feature_diagnostics(state);
    } else if is_feature_file(&path) {
        state.sync_feature_usage();
    }
}

/// Handle `textDocument/didClose` notifications.
pub fn handle_did_close_text_document(state: &mut ServerState, params: DidCloseTextDocumentParams) {
    state.remove_document(&params.text_document.uri);
}

fn is_feature_uri(uri: &lsp_types::Url) -> bool {
    uri.to_file_path().is_ok_and(|path| is_feature_file(&path))
}
