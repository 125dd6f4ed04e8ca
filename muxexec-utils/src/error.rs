//! Error types for muxexec
//!
//! Provides a unified error type used across all muxexec crates.

use std::path::PathBuf;

/// Main error type for muxexec operations
#[derive(Debug, thiserror::Error)]
pub enum MuxexecError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Transport Errors ===

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to spawn {program}: {source}")]
    TransportSpawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Transport command exited with status {code}: {stderr}")]
    TransportExit { code: i32, stderr: String },

    // === Session Errors ===

    #[error("Session busy: {session}")]
    Busy { session: String },

    #[error("Session locked by another muxexec process: {session}")]
    Locked { session: String },

    #[error("Marker not found in scrollback of {session}")]
    MarkerNotFound { session: String },

    #[error("No previous invocation recorded for {session}")]
    NoInvocation { session: String },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // === Persistence Errors ===

    #[error("Persistence error: {0}")]
    Persistence(String),

    // === Generic Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MuxexecError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error ends the current invocation attempt
    ///
    /// Marker loss is not fatal: the caller falls back to a degraded tail of
    /// the pane instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MarkerNotFound { .. } | Self::NoInvocation { .. }
        )
    }

    /// Check if the error reports an occupied session
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::Locked { .. })
    }
}

/// Result type alias using MuxexecError
pub type Result<T> = std::result::Result<T, MuxexecError>;
