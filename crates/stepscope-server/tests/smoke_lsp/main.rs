//! End-to-end smoke tests for the `stepscope-lsp` binary.
//!
//! These tests start the language server as a child process, send JSON-RPC
//! messages over stdin/stdout, and verify responses and diagnostics. They
//! cover CLI argument parsing, server startup, settings, handler responses
//! and graceful shutdown.

mod wire;

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin};

use serde_json::{Value, json};
use tempfile::TempDir;

use wire::{
    MessageReceiver, did_open, initialize, is_diagnostics, is_show_message, notify, request,
    server_command, shutdown_and_exit, spawn_server, wait_for_exit,
};

const STEPS: &str = concat!(
    "Given('a user exists', () => {});\n",
    "When(/^the user buys (\\d+) apples$/, () => {});\n",
);

const FEATURE: &str = concat!(
    "Feature: smoke\n",
    "  Scenario: basic\n",
    "    Given a user exists\n",
    "    When the user sells 3 apples\n",
    "    When the user \n",
);

/// Write the step definitions and feature file into `dir`.
#[expect(
    clippy::expect_used,
    reason = "file-write failures are test-fatal I/O errors"
)]
fn create_test_files(dir: &TempDir) -> PathBuf {
    let steps_dir = dir.path().join("steps");
    std::fs::create_dir_all(&steps_dir).expect("create steps dir");
    std::fs::write(steps_dir.join("shop.js"), STEPS).expect("write steps");
    let feature_path = dir.path().join("smoke.feature");
    std::fs::write(&feature_path, FEATURE).expect("write feature");
    feature_path
}

/// Spawn the LSP server, perform the initialize handshake, and return the
/// child process, its stdin handle, the message receiver and the
/// initialize response.
#[expect(
    clippy::expect_used,
    reason = "server setup failures are test-fatal environment errors"
)]
fn setup_server(dir: &TempDir, options: Value) -> (Child, ChildStdin, MessageReceiver, Value) {
    let root_uri = lsp_types::Url::from_directory_path(dir.path()).expect("dir URI");
    let mut child = spawn_server();
    let mut stdin = child.stdin.take().expect("stdin");
    let stdout = child.stdout.take().expect("stdout");
    let receiver = MessageReceiver::spawn(BufReader::new(stdout));
    let response = initialize(&mut stdin, &receiver, root_uri.as_str(), options);
    (child, stdin, receiver, response)
}

/// Open the feature file and wait for its diagnostics.
#[expect(
    clippy::expect_used,
    reason = "missing diagnostics notification is a test-fatal condition"
)]
fn open_and_wait(
    stdin: &mut ChildStdin,
    receiver: &MessageReceiver,
    feature_path: &Path,
) -> Value {
    did_open(stdin, feature_path, FEATURE);
    receiver
        .recv_notification_matching(is_diagnostics, 20)
        .expect("expected a publishDiagnostics notification after didOpen")
}

#[test]
#[expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "test assertions use .expect() and indexing for clear failure messages"
)]
fn smoke_initialize_and_shutdown() {
    let dir = TempDir::new().expect("temp dir");
    let (mut child, mut stdin, receiver, response) = setup_server(&dir, Value::Null);

    let caps = &response["result"]["capabilities"];
    assert_eq!(caps["definitionProvider"], json!(true));
    assert_eq!(caps["completionProvider"]["resolveProvider"], json!(true));
    assert_eq!(caps["textDocumentSync"]["change"], json!(1));
    assert_eq!(response["result"]["serverInfo"]["name"], "stepscope-lsp");

    shutdown_and_exit(&mut stdin, &receiver, &mut child, 99);
}

#[test]
#[expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "test assertions use .expect() and indexing for clear failure messages"
)]
fn smoke_diagnostics_published_on_open() {
    let dir = TempDir::new().expect("temp dir");
    let feature_path = create_test_files(&dir);
    let (mut child, mut stdin, receiver, _) =
        setup_server(&dir, json!({ "cucumberautocomplete": { "steps": ["steps"] } }));

    let published = open_and_wait(&mut stdin, &receiver, &feature_path);
    let diagnostics = published["params"]["diagnostics"]
        .as_array()
        .expect("diagnostics array");
    assert_eq!(diagnostics.len(), 2, "got: {diagnostics:?}");
    assert_eq!(diagnostics[0]["range"]["start"], json!({ "line": 3, "character": 4 }));
    assert_eq!(diagnostics[0]["severity"], json!(2));
    assert_eq!(
        diagnostics[0]["message"],
        r#"Was unable to find step for "When the user sells 3 apples""#
    );

    shutdown_and_exit(&mut stdin, &receiver, &mut child, 99);
}

#[test]
#[expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "test assertions use .expect() and indexing for clear failure messages"
)]
fn smoke_completion_and_definition_requests() {
    let dir = TempDir::new().expect("temp dir");
    let feature_path = create_test_files(&dir);
    let (mut child, mut stdin, receiver, _) = setup_server(
        &dir,
        json!({ "steps": ["steps"], "smartSnippets": true }),
    );
    open_and_wait(&mut stdin, &receiver, &feature_path);
    let uri = lsp_types::Url::from_file_path(&feature_path).expect("feature URI");

    let position = |line: u32, character: u32| {
        json!({
            "textDocument": { "uri": uri.as_str() },
            "position": { "line": line, "character": character },
        })
    };

    request(&mut stdin, 2, "textDocument/completion", position(4, 18));
    let (completion, _) = receiver.recv_response_for_id(2, 20);
    let items = completion["result"].as_array().expect("completion items");
    assert_eq!(items.len(), 1, "got: {items:?}");
    assert_eq!(items[0]["insertText"], "buys ${1:} apples");
    assert_eq!(items[0]["insertTextFormat"], json!(2));

    request(&mut stdin, 3, "completionItem/resolve", items[0].clone());
    let (resolved, _) = receiver.recv_response_for_id(3, 20);
    assert_eq!(resolved["result"]["label"], items[0]["label"]);

    request(&mut stdin, 4, "textDocument/definition", position(2, 10));
    let (definition, _) = receiver.recv_response_for_id(4, 20);
    let target = definition["result"]["uri"].as_str().expect("location uri");
    assert!(target.ends_with("steps/shop.js"), "got: {target}");
    assert_eq!(definition["result"]["range"]["start"]["line"], json!(0));

    shutdown_and_exit(&mut stdin, &receiver, &mut child, 99);
}

#[test]
#[expect(
    clippy::expect_used,
    reason = "test assertions use .expect() for clear failure messages"
)]
fn smoke_configuration_change_republishes_diagnostics() {
    let dir = TempDir::new().expect("temp dir");
    let feature_path = create_test_files(&dir);
    let (mut child, mut stdin, receiver, _) = setup_server(&dir, json!({ "steps": ["steps"] }));
    open_and_wait(&mut stdin, &receiver, &feature_path);

    notify(&mut stdin, "$/unknownNotification", json!({}));
    notify(
        &mut stdin,
        "workspace/didChangeConfiguration",
        json!({ "settings": { "cucumberautocomplete": { "steps": ["missing"] } } }),
    );
    let warning = receiver
        .recv_notification_matching(is_show_message, 20)
        .expect("expected a warning about the unmatched steps entry");
    assert_eq!(warning.pointer("/params/type"), Some(&json!(2)));
    assert_eq!(
        warning.pointer("/params/message").and_then(Value::as_str),
        Some("No steps files found for: missing")
    );
    let republished = receiver
        .recv_notification_matching(is_diagnostics, 20)
        .expect("expected diagnostics after the configuration change");
    let count = republished
        .pointer("/params/diagnostics")
        .and_then(Value::as_array)
        .map(Vec::len);
    assert_eq!(count, Some(3));

    shutdown_and_exit(&mut stdin, &receiver, &mut child, 99);
}

#[test]
#[expect(
    clippy::expect_used,
    reason = "spawn failures are test-fatal environment errors"
)]
fn smoke_invalid_environment_exits_with_code_two() {
    let mut child = server_command()
        .env("STEPSCOPE_LOG_LEVEL", "chatty")
        .spawn()
        .expect("start stepscope-lsp binary");
    assert_eq!(wait_for_exit(&mut child), Some(2));
}
