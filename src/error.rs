//! Error types for http-fetch-agent
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (validation, transport, short writes, etc.)
//! - RPC error-code mapping for the on-demand trigger path
//! - Context information (configuration key, destination path, status code)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for http-fetch-agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for http-fetch-agent
///
/// Trigger-phase variants (`Config`, `Validation`, `Io`, `ResourceExhausted`,
/// `Transport`) are detected synchronously before a session reaches the
/// event-driven phase and are reported immediately. `ShortWrite` and `Remote`
/// are only ever surfaced through the reporting strategy at session close.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "schedule.url")
        key: Option<String>,
    },

    /// A required request field is missing or empty
    #[error("expecting url or file")]
    Validation,

    /// Destination file could not be opened
    #[error("cannot open {}", path.display())]
    SinkOpen {
        /// The destination path that could not be opened
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session resources could not be allocated.
    ///
    /// Kept for the on-demand trigger's validation contract; session
    /// construction itself is infallible in this implementation, so no
    /// current code path produces this variant.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Connection could not be initiated (malformed URL or engine rejection)
    #[error("malformed URL: {0}")]
    Transport(String),

    /// A chunk write persisted fewer bytes than were offered
    #[error("short write: persisted {written} of {offered} bytes")]
    ShortWrite {
        /// Bytes actually persisted by the sink
        written: usize,
        /// Bytes offered by the connection engine
        offered: usize,
    },

    /// Transfer completed but the final status code was not 200
    #[error("remote returned status {status}")]
    Remote {
        /// The terminal HTTP status code recorded by the session
        status: i32,
    },

    /// An event was delivered to a session that already finalized.
    ///
    /// Events after the close transition are a defect in the event source,
    /// not a no-op; the session refuses them.
    #[error("session already finalized")]
    SessionFinalized,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convert errors to numeric RPC error codes for the on-demand path
///
/// Mirrors the reference behavior: every trigger-phase failure is reported as
/// code 500 with a descriptive message, while a completed-but-failed transfer
/// reports the terminal HTTP status itself.
pub trait ToRpcCode {
    /// Get the numeric RPC error code for this error
    fn rpc_code(&self) -> i32;
}

impl ToRpcCode for Error {
    fn rpc_code(&self) -> i32 {
        match self {
            // 500 - trigger-phase failures (validation, file open, resources, URL)
            Error::Config { .. } => 500,
            Error::Validation => 500,
            Error::SinkOpen { .. } => 500,
            Error::Io(_) => 500,
            Error::ResourceExhausted(_) => 500,
            Error::Transport(_) => 500,
            Error::Serialization(_) => 500,

            // 500 - write failures force the fixed failure status
            Error::ShortWrite { .. } => 500,

            // The terminal status code is the error code
            Error::Remote { status } => *status,

            // Defect in the event source
            Error::SessionFinalized => 500,
        }
    }
}
