//! Semantic error types for the language server.
//!
//! Engine failures, malformed editor settings and protocol misuse each get
//! their own variant so handlers can decide between logging and replying
//! with an error.

use stepscope_patterns::PatternError;
use thiserror::Error;

/// Errors that can occur during language server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// An invalid process-level configuration value was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The editor sent settings that do not deserialise.
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// A grammar derived from the settings does not compile.
    #[error("step grammar rejected: {0}")]
    Pattern(#[from] PatternError),

    /// Server received a request before initialisation completed.
    #[error("server not initialised")]
    NotInitialised,

    /// Server received a duplicate initialisation request.
    #[error("server already initialised")]
    AlreadyInitialised,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
