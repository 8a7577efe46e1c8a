//! LSP request and notification handlers.
//!
//! Handlers receive the shared [`ServerState`](crate::server::ServerState)
//! from the async-lsp router, translate protocol values into engine calls
//! and convert the results back.

mod completion;
mod definition;
mod diagnostics;
mod lifecycle;
mod text_document;
mod util;
mod workspace;

pub use completion::{handle_completion, handle_completion_resolve, to_completion_item};
pub use definition::handle_definition;
pub use diagnostics::{
    DIAGNOSTIC_SOURCE, compute_step_diagnostics, publish_all_feature_diagnostics,
    publish_feature_diagnostics,
};
pub use lifecycle::{handle_initialise, handle_initialised, handle_shutdown};
pub use text_document::{
    handle_did_change_text_document, handle_did_close_text_document,
    handle_did_open_text_document, handle_did_save_text_document,
};
pub use workspace::handle_did_change_configuration;

use util::document_text;
