//! Core language server state and service construction.
//!
//! [`ServerState`] is shared by every handler through the async-lsp router.
//! It owns the engine's [`StepCatalog`], the text of open documents and the
//! current editor settings.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_lsp::ClientSocket;
use async_lsp::lsp_types::notification;
use lsp_types::{
    ClientCapabilities, CompletionOptions, MessageType, OneOf, SaveOptions, ServerCapabilities,
    ShowMessageParams, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, Url,
};
use stepscope_patterns::StepCatalog;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, Settings};
use crate::discovery::{find_feature_files, find_step_files};
use crate::error::ServerError;

/// Central state shared across all LSP handlers.
pub struct ServerState {
    client: Option<ClientSocket>,
    client_capabilities: Option<ClientCapabilities>,
    workspace_root: Option<PathBuf>,
    initialised: bool,
    config: ServerConfig,
    settings: Settings,
    catalog: Option<StepCatalog>,
    documents: HashMap<Url, String>,
    unmatched_steps: Vec<String>,
}

impl fmt::Debug for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerState")
            .field("workspace_root", &self.workspace_root)
            .field("initialised", &self.initialised)
            .field("config", &self.config)
            .field("settings", &self.settings)
            .field("documents", &self.documents.len())
            .field("unmatched_steps", &self.unmatched_steps)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// Create a new server state with the given configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepscope_server::config::ServerConfig;
    /// use stepscope_server::server::ServerState;
    ///
    /// let state = ServerState::new(ServerConfig::default());
    /// assert!(!state.is_initialised());
    /// assert!(state.catalog().is_err());
    /// ```
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            client: None,
            client_capabilities: None,
            workspace_root: None,
            initialised: false,
            config,
            settings: Settings::default(),
            catalog: None,
            documents: HashMap::new(),
            unmatched_steps: Vec::new(),
        }
    }

    /// Attach the socket used for server-initiated notifications.
    pub fn set_client(&mut self, client: ClientSocket) {
        self.client = Some(client);
    }

    /// The client socket, when running under a main loop.
    #[must_use]
    pub fn client(&self) -> Option<&ClientSocket> {
        self.client.as_ref()
    }

    /// Store client capabilities received during initialisation.
    pub fn set_client_capabilities(&mut self, capabilities: ClientCapabilities) {
        self.client_capabilities = Some(capabilities);
    }

    /// Access the stored client capabilities, if any.
    #[must_use]
    pub fn client_capabilities(&self) -> Option<&ClientCapabilities> {
        self.client_capabilities.as_ref()
    }

    /// Set the directory settings paths are resolved against.
    pub fn set_workspace_root(&mut self, root: PathBuf) {
        self.workspace_root = Some(root);
    }

    /// The workspace root, once known.
    #[must_use]
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    /// Access the process-level configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Access the current editor settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mark the server as initialised.
    pub fn mark_initialised(&mut self) {
        self.initialised = true;
    }

    /// Check if the server is initialised.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// The step catalog built from the current settings.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::NotInitialised` before settings were applied.
    pub fn catalog(&self) -> Result<&StepCatalog, ServerError> {
        self.catalog.as_ref().ok_or(ServerError::NotInitialised)
    }

    /// Replace the settings and rebuild the catalog for them.
    ///
    /// When the definition grammar overrides do not compile they are dropped
    /// with a warning and the default grammar is used. Call
    /// [`rescan`](Self::rescan) afterwards to populate the new catalog.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings do not describe valid options or
    /// the default grammar does not compile for them either. The previous
    /// settings stay in effect.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), ServerError> {
        let options = settings.match_options()?;
        let catalog = StepCatalog::new(options.clone()).or_else(|err| {
            warn!(error = %err, "ignoring definition grammar overrides");
            StepCatalog::new(options.without_grammar_overrides())
        })?;
        self.catalog = Some(catalog);
        self.settings = settings;
        Ok(())
    }

    /// Rebuild the catalog's registry from the configured step files.
    ///
    /// Unreadable files are logged and skipped. `steps` entries matching no
    /// file are remembered and reported to the client as a warning. When
    /// feature syncing is enabled step usage is recounted afterwards.
    /// Returns the number of registered steps.
    pub fn rescan(&mut self) -> usize {
        let (Some(root), Some(catalog)) = (self.workspace_root.as_deref(), self.catalog.as_ref())
        else {
            debug!("rescan skipped before initialisation");
            return 0;
        };
        let found = find_step_files(root, &self.settings.steps);
        let steps = catalog.rescan(read_sources(found.files));
        self.unmatched_steps = found.unmatched;
        self.report_unmatched_steps();
        self.sync_feature_usage();
        steps
    }

    /// `steps` entries that matched no file during the last rescan.
    #[must_use]
    pub fn unmatched_step_entries(&self) -> &[String] {
        &self.unmatched_steps
    }

    fn report_unmatched_steps(&self) {
        if self.unmatched_steps.is_empty() {
            return;
        }
        let Some(client) = self.client.as_ref() else {
            return;
        };
        let params = ShowMessageParams {
            typ: MessageType::WARNING,
            message: format!(
                "No steps files found for: {}",
                self.unmatched_steps.join(", ")
            ),
        };
        if let Err(err) = client.notify::<notification::ShowMessage>(params) {
            warn!(error = %err, "failed to report missing step files");
        }
    }

    /// Recount step usage from the configured feature files.
    pub fn sync_feature_usage(&self) {
        let (Some(root), Some(catalog)) = (self.workspace_root.as_deref(), self.catalog.as_ref())
        else {
            return;
        };
        let Some(pattern) = self.settings.sync_features.pattern() else {
            return;
        };
        let documents = read_sources(find_feature_files(root, pattern));
        let matched = catalog.sync_usage(documents.iter().map(|(_, text)| text));
        info!(pattern, features = documents.len(), matched, "synchronised feature usage");
    }

    /// Remember the latest text of an open document.
    pub fn upsert_document(&mut self, uri: Url, text: String) {
        self.documents.insert(uri, text);
    }

    /// Forget a closed document.
    pub fn remove_document(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }

    /// Text of an open document.
    #[must_use]
    pub fn document(&self, uri: &Url) -> Option<&str> {
        self.documents.get(uri).map(String::as_str)
    }

    /// URIs of every open document.
    pub fn open_documents(&self) -> impl Iterator<Item = &Url> {
        self.documents.keys()
    }
}

fn read_sources(paths: Vec<PathBuf>) -> Vec<(PathBuf, String)> {
    paths
        .into_iter()
        .filter_map(|path| match std::fs::read_to_string(&path) {
            Ok(text) => Some((path, text)),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable file");
                None
            }
        })
        .collect()
}

/// Build the server capabilities to advertise to the client.
#[must_use]
pub fn build_server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
                ..TextDocumentSyncOptions::default()
            },
        )),
        definition_provider: Some(OneOf::Left(true)),
        completion_provider: Some(CompletionOptions {
            resolve_provider: Some(true),
            trigger_characters: Some(vec![" ".to_owned()]),
            ..CompletionOptions::default()
        }),
        ..ServerCapabilities::default()
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_state_is_not_initialised() {
        let mut state = ServerState::new(ServerConfig::default());
        assert!(!state.is_initialised());
        assert!(state.client().is_none());
        assert!(state.client_capabilities().is_none());
        assert!(state.workspace_root().is_none());
        assert!(matches!(state.catalog(), Err(ServerError::NotInitialised)));
        assert_eq!(state.rescan(), 0);
        assert!(state.unmatched_step_entries().is_empty());
    }

    #[test]
    fn mark_initialised_sets_flag() {
        let mut state = ServerState::new(ServerConfig::default());
        state.mark_initialised();
        assert!(state.is_initialised());
    }

    #[test]
    fn invalid_grammar_override_falls_back_to_default() {
        let mut state = ServerState::new(ServerConfig::default());
        let settings = Settings::from_value(json!({ "stepRegExSymbol": "(" })).expect("shape");
        state.apply_settings(settings).expect("fallback grammar");
        let catalog = state.catalog().expect("catalog built");
        assert!(catalog.options().step_regex_symbol.is_none());
        assert_eq!(state.settings().step_regex_symbol.as_deref(), Some("("));
    }

    #[test]
    fn rejected_settings_keep_previous_state() {
        let mut state = ServerState::new(ServerConfig::default());
        let settings = Settings::from_value(json!({ "keywords": { "Nope": ["x"] } })).expect("shape");
        assert!(state.apply_settings(settings).is_err());
        assert!(state.catalog().is_err());
        assert_eq!(state.settings(), &Settings::default());
    }

    #[test]
    fn tracks_open_documents() {
        let mut state = ServerState::new(ServerConfig::default());
        let uri = Url::parse("file:///ws/a.feature").expect("uri");
        state.upsert_document(uri.clone(), "Feature: a".to_owned());
        assert_eq!(state.document(&uri), Some("Feature: a"));
        assert_eq!(state.open_documents().count(), 1);
        state.remove_document(&uri);
        assert!(state.document(&uri).is_none());
    }

    #[test]
    fn advertises_sync_definition_and_completion() {
        let capabilities = build_server_capabilities();
        assert!(capabilities.text_document_sync.is_some());
        assert_eq!(capabilities.definition_provider, Some(OneOf::Left(true)));
        let completion = capabilities.completion_provider.expect("completion");
        assert_eq!(completion.resolve_provider, Some(true));
    }
}
