//! Language Server Protocol front end for the stepscope step engine.
//!
//! This crate wraps the [`stepscope_patterns`] catalog in an LSP server so
//! editors can validate, complete and navigate Gherkin steps against the step
//! definitions of a project.
//!
//! # Overview
//!
//! The server communicates via JSON-RPC over stdin/stdout and supports:
//!
//! - Full-text document sync with step diagnostics for `.feature` files
//! - Step and parameter value completion, ordered by display text
//! - Go to definition from a step line to its definition
//! - Settings from `initializationOptions` and `didChangeConfiguration`
//!
//! # Configuration
//!
//! Process-level options come from environment variables:
//!
//! - `STEPSCOPE_LOG_LEVEL`: Log verbosity (trace, debug, info, warn, error)
//!
//! Workspace settings are sent by the editor under the
//! `cucumberautocomplete` section; see [`config::Settings`].
//!
//! # Example
//!
//! ```ignore
//! use stepscope_server::config::ServerConfig;
//! use stepscope_server::server::ServerState;
//!
//! let config = ServerConfig::from_env()?;
//! let state = ServerState::new(config);
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod util;

/// Test support utilities for unit and integration tests.
///
/// This module is hidden from documentation as it's intended for internal
/// test use only.
#[cfg(feature = "test-support")]
#[doc(hidden)]
pub mod test_support;
