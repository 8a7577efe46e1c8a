//! Document access shared by the request handlers.

use std::borrow::Cow;

use lsp_types::Url;
use tracing::debug;

use crate::server::ServerState;

/// Text of `uri`: the open document when tracked, else the file on disk.
pub(crate) fn document_text<'a>(state: &'a ServerState, uri: &Url) -> Option<Cow<'a, str>> {
    if let Some(text) = state.document(uri) {
        return Some(Cow::Borrowed(text));
    }
    let path = uri.to_file_path().ok()?;
    std::fs::read_to_string(&path)
        .inspect_err(|err| debug!(path = %path.display(), error = %err, "cannot read document"))
        .ok()
        .map(Cow::Owned)
}
