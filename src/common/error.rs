//! Error types for the debug adapter
//!
//! Protocol errors coming from the IDE are answered with DAP error
//! responses and never surface here; this enum covers the failures that
//! can actually take the adapter down or that callers need to branch on.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the debug adapter
#[derive(Error, Debug)]
pub enum Error {
    // === DAP Transport Errors ===
    #[error("DAP client disconnected")]
    ClientDisconnected,

    #[error("DAP protocol error: {0}")]
    DapProtocol(String),

    // === Remote Target Errors ===
    #[error("Remote transport error: {0}")]
    RemoteTransport(String),

    #[error("Target endpoint is offline")]
    TargetOffline,

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid target address '{0}': expected host:port")]
    InvalidTargetAddress(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a remote transport error
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::RemoteTransport(message.into())
    }
}
