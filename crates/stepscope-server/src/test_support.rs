//! Shared test support utilities for stepscope-server tests.
//!
//! This module provides common infrastructure for both unit and integration
//! tests, including:
//! - Temporary workspace creation with step and feature files
//! - Initialisation through the real `initialize` handler
//! - Opening feature documents via simulated `didOpen` events

use std::path::{Path, PathBuf};

use lsp_types::{
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, InitializeParams,
    TextDocumentIdentifier, TextDocumentItem, Url, WorkspaceFolder,
};
use serde_json::{Map, Value};
use tempfile::TempDir;

use crate::config::ServerConfig;
use crate::handlers::{
    handle_did_open_text_document, handle_did_save_text_document, handle_initialise,
    handle_initialised,
};
use crate::server::ServerState;

/// Newtype wrapper for test file names to improve type safety.
#[derive(Debug, Clone)]
pub struct Filename(pub(crate) String);

impl From<&str> for Filename {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for Filename {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Filename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Newtype wrapper for file contents to improve type safety.
#[derive(Debug, Clone)]
pub struct FileContent(pub(crate) String);

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for FileContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of building a test scenario.
///
/// Contains the temporary workspace (for constructing file paths) and the
/// initialised server state.
pub struct TestScenario {
    /// Temporary directory acting as the workspace root.
    pub dir: TempDir,
    /// Server state after `initialize`, `initialized` and `didOpen`.
    pub state: ServerState,
}

impl TestScenario {
    /// Absolute path of a workspace file.
    #[must_use]
    pub fn path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(filename)
    }

    /// File URI of a workspace file.
    ///
    /// # Panics
    ///
    /// Panics if the path cannot be converted to a URI.
    #[expect(clippy::expect_used, reason = "test helper uses expect for clarity")]
    #[must_use]
    pub fn uri(&self, filename: &str) -> Url {
        Url::from_file_path(self.path(filename)).expect("file URI")
    }

    /// Overwrite a workspace file and simulate saving it.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[expect(clippy::expect_used, reason = "test helper uses expect for clarity")]
    pub fn save(&mut self, filename: &str, content: &str) {
        std::fs::write(self.path(filename), content).expect("write saved file");
        let params = DidSaveTextDocumentParams {
            text_document: TextDocumentIdentifier {
                uri: self.uri(filename),
            },
            text: None,
        };
        handle_did_save_text_document(&mut self.state, params);
    }
}

/// Open a document by simulating an LSP `textDocument/didOpen` event.
pub fn open_document(state: &mut ServerState, uri: Url, text: &str) {
    let params = DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri,
            language_id: "feature".to_owned(),
            version: 1,
            text: text.to_owned(),
        },
    };
    handle_did_open_text_document(state, params);
}

/// Builder for constructing test workspaces with step and feature files.
///
/// Step files are listed in the `steps` setting automatically unless the
/// scenario provides its own.
pub struct ScenarioBuilder {
    dir: TempDir,
    step_files: Vec<(String, String)>,
    feature_files: Vec<(String, String)>,
    settings: Map<String, Value>,
    state: ServerState,
}

impl ScenarioBuilder {
    /// Create a new scenario builder with a fresh temp directory and server state.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[expect(clippy::expect_used, reason = "builder panics on temp dir failure")]
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        Self {
            dir,
            step_files: Vec::new(),
            feature_files: Vec::new(),
            settings: Map::new(),
            state: ServerState::new(ServerConfig::default()),
        }
    }

    fn add_file(
        collection: &mut Vec<(String, String)>,
        filename: impl Into<Filename>,
        content: impl Into<FileContent>,
    ) {
        let filename = filename.into();
        let content = content.into();
        collection.push((filename.0, content.0));
    }

    /// Add a step definition file to be written before initialisation.
    #[must_use]
    pub fn with_steps(
        mut self,
        filename: impl Into<Filename>,
        content: impl Into<FileContent>,
    ) -> Self {
        Self::add_file(&mut self.step_files, filename, content);
        self
    }

    /// Add a feature file to be written and opened.
    #[must_use]
    pub fn with_feature(
        mut self,
        filename: impl Into<Filename>,
        content: impl Into<FileContent>,
    ) -> Self {
        Self::add_file(&mut self.feature_files, filename, content);
        self
    }

    /// Set one settings key sent as initialisation options.
    #[must_use]
    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_owned(), value);
        self
    }

    /// Build the scenario: write every file, initialise the server and open
    /// the feature files.
    ///
    /// # Panics
    ///
    /// Panics if any file cannot be written or initialisation fails.
    #[expect(clippy::expect_used, reason = "builder panics on setup failure")]
    #[must_use]
    pub fn build(mut self) -> TestScenario {
        for (filename, content) in self.step_files.iter().chain(&self.feature_files) {
            write_file(self.dir.path(), filename, content);
        }
        if !self.settings.contains_key("steps") {
            let steps = self
                .step_files
                .iter()
                .map(|(filename, _)| Value::String(filename.clone()))
                .collect();
            self.settings.insert("steps".to_owned(), Value::Array(steps));
        }

        let root = Url::from_file_path(self.dir.path()).expect("root URI");
        let params = InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root,
                name: "workspace".to_owned(),
            }]),
            initialization_options: Some(Value::Object(self.settings)),
            ..InitializeParams::default()
        };
        handle_initialise(&mut self.state, params).expect("initialise");
        handle_initialised(&mut self.state, lsp_types::InitializedParams {});

        for (filename, content) in &self.feature_files {
            let uri = Url::from_file_path(self.dir.path().join(filename)).expect("file URI");
            open_document(&mut self.state, uri, content);
        }
        TestScenario {
            dir: self.dir,
            state: self.state,
        }
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[expect(clippy::expect_used, reason = "test helper panics on write failure")]
fn write_file(root: &Path, filename: &str, content: &str) {
    let path = root.join(filename);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directories");
    }
    std::fs::write(&path, content).expect("write scenario file");
}
