//! JSON-RPC wire protocol helpers for smoke tests.
//!
//! Provides message encoding, a timeout-aware [`MessageReceiver`], and
//! server lifecycle helpers for driving the `stepscope-lsp` binary in
//! end-to-end tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use serde_json::{Value, json};

/// Maximum time to wait for a single JSON-RPC message before assuming the
/// server has stalled.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum time to wait for the server process to exit.
pub const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of JSON-RPC messages to scan through during lifecycle
/// handshake exchanges (initialize, shutdown).
const MAX_HANDSHAKE_MESSAGES: usize = 10;

/// Encode a JSON-RPC message with Content-Length header.
#[expect(
    clippy::expect_used,
    reason = "serialization failure is a test-fatal programming error"
)]
pub fn encode_message(body: &Value) -> Vec<u8> {
    let body_bytes = serde_json::to_vec(body).expect("serialize JSON-RPC body");
    let mut msg = format!("Content-Length: {}\r\n\r\n", body_bytes.len()).into_bytes();
    msg.extend_from_slice(&body_bytes);
    msg
}

/// A channel-based message receiver that reads JSON-RPC messages on a
/// background thread and delivers them with a timeout.
pub struct MessageReceiver {
    rx: mpsc::Receiver<Value>,
}

/// Read LSP headers and return the content length, or `None` on EOF or
/// when no body follows.
#[expect(
    clippy::expect_used,
    reason = "header parse failures are test-fatal programming errors"
)]
fn read_headers(reader: &mut BufReader<impl Read>) -> Option<usize> {
    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).expect("read header line");
        if bytes_read == 0 {
            return None;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Some(len_str) = trimmed.strip_prefix("Content-Length: ") {
            content_length = len_str.parse().expect("parse content length");
        }
    }
    (content_length > 0).then_some(content_length)
}

impl MessageReceiver {
    /// Spawn a background reader thread for the given `BufReader`.
    #[expect(
        clippy::expect_used,
        reason = "body parse failures are test-fatal programming errors"
    )]
    pub fn spawn(mut reader: BufReader<impl Read + Send + 'static>) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            while let Some(content_length) = read_headers(&mut reader) {
                let mut buf = vec![0u8; content_length];
                reader.read_exact(&mut buf).expect("read body");
                let msg: Value = serde_json::from_slice(&buf).expect("parse JSON body");
                if tx.send(msg).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Receive the next message, blocking up to [`READ_TIMEOUT`].
    ///
    /// # Panics
    ///
    /// Panics if no message arrives within the timeout.
    #[expect(
        clippy::expect_used,
        reason = "timeout is a test-fatal condition indicating a server stall"
    )]
    pub fn recv(&self) -> Value {
        self.rx
            .recv_timeout(READ_TIMEOUT)
            .expect("timed out waiting for JSON-RPC message from server")
    }

    /// Receive messages until one has the given response `id`.
    ///
    /// Notifications received first are returned alongside the response.
    pub fn recv_response_for_id(&self, id: u64, max_messages: usize) -> (Value, Vec<Value>) {
        let mut notifications = Vec::new();
        for _ in 0..max_messages {
            let msg = self.recv();
            if msg.get("id").and_then(Value::as_u64) == Some(id) {
                return (msg, notifications);
            }
            notifications.push(msg);
        }
        panic!("did not receive response with id {id} within {max_messages} messages");
    }

    /// Receive messages until one matches the predicate, or the limit is
    /// reached.
    pub fn recv_notification_matching(
        &self,
        predicate: impl Fn(&Value) -> bool,
        max_messages: usize,
    ) -> Option<Value> {
        for _ in 0..max_messages {
            let msg = self.recv();
            if predicate(&msg) {
                return Some(msg);
            }
        }
        None
    }
}

/// Build a command running the `stepscope-lsp` binary.
pub fn server_command() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_stepscope-lsp"));
    command
        .env_remove("STEPSCOPE_LOG_LEVEL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    command
}

/// Spawn the `stepscope-lsp` binary with quiet logging.
#[expect(
    clippy::expect_used,
    reason = "binary spawn failure is a test-fatal environment error"
)]
pub fn spawn_server() -> Child {
    server_command()
        .args(["--log-level", "error"])
        .spawn()
        .expect("start stepscope-lsp binary")
}

/// Send a JSON-RPC message to the server's stdin.
#[expect(
    clippy::expect_used,
    reason = "write failure is a test-fatal I/O error"
)]
pub fn send(stdin: &mut impl Write, body: &Value) {
    stdin
        .write_all(&encode_message(body))
        .expect("write message");
    stdin.flush().expect("flush stdin");
}

/// Send a request with the given `id`, `method` and `params`.
pub fn request(stdin: &mut impl Write, id: u64, method: &str, params: Value) {
    send(
        stdin,
        &json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }),
    );
}

/// Send a notification with the given `method` and `params`.
pub fn notify(stdin: &mut impl Write, method: &str, params: Value) {
    send(
        stdin,
        &json!({ "jsonrpc": "2.0", "method": method, "params": params }),
    );
}

/// Perform the initialize handshake and return the initialize result.
pub fn initialize(
    stdin: &mut impl Write,
    receiver: &MessageReceiver,
    root_uri: &str,
    options: Value,
) -> Value {
    request(
        stdin,
        1,
        "initialize",
        json!({
            "processId": null,
            "capabilities": {},
            "rootUri": root_uri,
            "initializationOptions": options,
        }),
    );
    let (response, _notifications) = receiver.recv_response_for_id(1, MAX_HANDSHAKE_MESSAGES);
    notify(stdin, "initialized", json!({}));
    response
}

/// Send shutdown request and exit notification, then wait for exit.
#[expect(
    clippy::indexing_slicing,
    reason = "JSON path indexing returns Null for missing keys"
)]
pub fn shutdown_and_exit(
    stdin: &mut impl Write,
    receiver: &MessageReceiver,
    child: &mut Child,
    request_id: u64,
) {
    request(stdin, request_id, "shutdown", Value::Null);
    let (shutdown_response, _) = receiver.recv_response_for_id(request_id, MAX_HANDSHAKE_MESSAGES);
    assert_eq!(shutdown_response["id"], request_id, "shutdown response id");

    notify(stdin, "exit", Value::Null);
    let status = wait_for_exit(child);
    assert_eq!(status, Some(0), "server should exit cleanly");
}

/// Wait up to [`EXIT_TIMEOUT`] for `child` to exit and return its exit code.
///
/// The process is killed when it stalls.
#[expect(
    clippy::expect_used,
    reason = "status polling failure is a test-fatal environment error"
)]
pub fn wait_for_exit(child: &mut Child) -> Option<i32> {
    let deadline = std::time::Instant::now() + EXIT_TIMEOUT;
    loop {
        match child.try_wait().expect("check server exit status") {
            Some(status) => return status.code(),
            None if std::time::Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                panic!(
                    "server did not exit within {} s; killed",
                    EXIT_TIMEOUT.as_secs()
                );
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    }
}

/// Send a `textDocument/didOpen` notification for a feature document.
#[expect(
    clippy::expect_used,
    reason = "file URI construction failure is a test-fatal path error"
)]
pub fn did_open(stdin: &mut impl Write, file_path: &Path, text: &str) {
    let uri = lsp_types::Url::from_file_path(file_path).expect("file URI");
    notify(
        stdin,
        "textDocument/didOpen",
        json!({
            "textDocument": {
                "uri": uri.as_str(),
                "languageId": "feature",
                "version": 1,
                "text": text,
            }
        }),
    );
}

/// Return `true` when `msg` is a `publishDiagnostics` notification.
pub fn is_diagnostics(msg: &Value) -> bool {
    msg.get("method").and_then(Value::as_str) == Some("textDocument/publishDiagnostics")
}

/// Return `true` when `msg` is a `window/showMessage` notification.
pub fn is_show_message(msg: &Value) -> bool {
    msg.get("method").and_then(Value::as_str) == Some("window/showMessage")
}
