//! LSP lifecycle handlers for initialisation and shutdown.

use std::path::PathBuf;

use async_lsp::ResponseError;
use lsp_types::{InitializeParams, InitializeResult, InitializedParams, ServerInfo, Url};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::ServerError;
use crate::server::{ServerState, build_server_capabilities};

/// Handle the `initialize` request from the client.
///
/// Stores the client capabilities, resolves the workspace root, applies the
/// settings carried in `initializationOptions` and performs the first
/// rescan. Malformed settings are logged and the defaults are used instead.
///
/// # Errors
///
/// Returns a `ResponseError` when the server is already initialised.
pub fn handle_initialise(
    state: &mut ServerState,
    params: InitializeParams,
) -> Result<InitializeResult, ResponseError> {
    if state.is_initialised() {
        return Err(response_error(
            &ServerError::AlreadyInitialised,
            async_lsp::ErrorCode::INVALID_REQUEST,
        ));
    }

    #[expect(
        deprecated,
        reason = "Some clients still populate root_uri instead of workspace_folders."
    )]
    let InitializeParams {
        capabilities,
        workspace_folders,
        root_uri,
        initialization_options,
        ..
    } = params;
    state.set_client_capabilities(capabilities);

    let folders = workspace_folders.unwrap_or_default();
    let root = extract_workspace_path(&folders, root_uri.as_ref());
    if root.is_none() {
        warn!("client supplied no file workspace root; step files cannot be scanned");
    }
    if let Some(root) = root {
        info!(root = %root.display(), "using workspace root");
        state.set_workspace_root(root);
    }

    let settings = Settings::from_value(initialization_options.unwrap_or_default())
        .unwrap_or_else(|err| {
            warn!(error = %err, "ignoring initialisation options");
            Settings::default()
        });
    let applied = state.apply_settings(settings).or_else(|err| {
        warn!(error = %err, "falling back to default settings");
        state.apply_settings(Settings::default())
    });
    if let Err(err) = applied {
        warn!(error = %err, "step catalog unavailable");
    }
    let steps = state.rescan();
    info!(steps, "indexed step definitions");

    Ok(InitializeResult {
        capabilities: build_server_capabilities(),
        server_info: Some(ServerInfo {
            name: "stepscope-lsp".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    })
}

/// Handle the `initialized` notification from the client.
pub fn handle_initialised(state: &mut ServerState, _params: InitializedParams) {
    state.mark_initialised();
    info!("server initialised");
}

/// Handle the `shutdown` request from the client.
///
/// # Errors
///
/// Currently always returns `Ok(())`.
pub fn handle_shutdown(_state: &mut ServerState) -> Result<(), ResponseError> {
    info!("shutdown request received");
    Ok(())
}

/// The first file-scheme workspace folder, else the root URI.
fn extract_workspace_path(
    workspace_folders: &[lsp_types::WorkspaceFolder],
    root_uri: Option<&Url>,
) -> Option<PathBuf> {
    workspace_folders
        .iter()
        .find_map(|folder| folder.uri.to_file_path().ok())
        .or_else(|| root_uri.and_then(|uri| uri.to_file_path().ok()))
}

/// Convert a server error to an LSP response error.
fn response_error(err: &ServerError, code: async_lsp::ErrorCode) -> ResponseError {
    ResponseError::new(code, err.to_string())
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use lsp_types::{ClientCapabilities, WorkspaceFolder};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn state() -> ServerState {
        ServerState::new(ServerConfig::default())
    }

    fn test_root() -> PathBuf {
        #[cfg(windows)]
        let root = PathBuf::from("C:\\folder\\path");
        #[cfg(not(windows))]
        let root = PathBuf::from("/folder/path");
        root
    }

    #[expect(deprecated, reason = "exercises single-root clients")]
    fn init_params(options: Option<serde_json::Value>) -> InitializeParams {
        let root = Url::from_file_path(test_root()).expect("valid path");
        InitializeParams {
            capabilities: ClientCapabilities::default(),
            root_uri: Some(root),
            initialization_options: options,
            ..Default::default()
        }
    }

    #[rstest]
    fn returns_server_info_and_capabilities(mut state: ServerState) {
        let result = handle_initialise(&mut state, init_params(None)).expect("initialise");
        let info = result.server_info.expect("server info");
        assert_eq!(info.name, "stepscope-lsp");
        assert!(info.version.is_some());
        assert!(result.capabilities.completion_provider.is_some());
        assert!(state.client_capabilities().is_some());
        assert_eq!(state.workspace_root(), Some(test_root().as_path()));
    }

    #[rstest]
    fn applies_initialisation_options(mut state: ServerState) {
        let options = json!({ "cucumberautocomplete": { "smartSnippets": true } });
        handle_initialise(&mut state, init_params(Some(options))).expect("initialise");
        assert!(state.settings().smart_snippets);
        assert!(state.catalog().expect("catalog").options().smart_snippets);
    }

    #[rstest]
    #[case(json!({ "steps": 1 }))]
    #[case(json!({ "keywords": { "Nope": ["x"] } }))]
    fn bad_options_fall_back_to_defaults(mut state: ServerState, #[case] options: serde_json::Value) {
        handle_initialise(&mut state, init_params(Some(options))).expect("initialise");
        assert_eq!(state.settings(), &Settings::default());
        assert!(state.catalog().is_ok());
    }

    #[rstest]
    fn fails_when_already_initialised(mut state: ServerState) {
        state.mark_initialised();
        assert!(handle_initialise(&mut state, init_params(None)).is_err());
    }

    #[rstest]
    fn initialised_notification_marks_state(mut state: ServerState) {
        handle_initialised(&mut state, InitializedParams {});
        assert!(state.is_initialised());
        assert!(handle_shutdown(&mut state).is_ok());
    }

    #[test]
    fn prefers_workspace_folders_over_root_uri() {
        let folder_path = test_root().join("folder");
        let folder = WorkspaceFolder {
            uri: Url::from_file_path(&folder_path).expect("valid path"),
            name: "folder".to_string(),
        };
        let root = Url::from_file_path(test_root()).expect("valid path");
        assert_eq!(
            extract_workspace_path(&[folder], Some(&root)),
            Some(folder_path)
        );
        assert_eq!(extract_workspace_path(&[], Some(&root)), Some(test_root()));
        assert_eq!(extract_workspace_path(&[], None), None);
    }
}
