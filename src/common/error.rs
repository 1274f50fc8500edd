//! Error types for the ltest daemon and client
//!
//! Every context-level error is caught at the control server boundary and
//! mapped to an HTTP status; none of them is allowed to take the listener down.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ltest
#[derive(Error, Debug)]
pub enum Error {
    // === Execution Context Errors ===
    #[error("Launch mode '{0}' is not supported (expected one of: fork, forkserver, spawn)")]
    LaunchModeUnsupported(String),

    #[error("Failed to launch worker: {0}")]
    LaunchFailed(String),

    #[error("Fork server error: {0}")]
    ForkServer(String),

    #[error("Failed to preload module '{module}': {reason}")]
    Preload { module: String, reason: String },

    #[error("Entry point '{0}' not found in any preloaded module")]
    EntryNotFound(String),

    #[error("Execution context is closed")]
    ContextClosed,

    // === Client Errors ===
    #[error("Request to the testing server failed: {0}")]
    TransportFailure(String),

    // === Configuration Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

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
    /// Create a launch failure from anything displayable
    pub fn launch_failed(reason: impl std::fmt::Display) -> Self {
        Self::LaunchFailed(reason.to_string())
    }

    /// Create a preload failure for a module
    pub fn preload(module: &str, reason: impl std::fmt::Display) -> Self {
        Self::Preload {
            module: module.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error means the worker never started
    ///
    /// These are reported to clients as an exit-code sentinel rather than
    /// an HTTP failure.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Error::LaunchFailed(_)
                | Error::ForkServer(_)
                | Error::Preload { .. }
                | Error::EntryNotFound(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::TransportFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_failures_are_classified() {
        assert!(Error::launch_failed("fork: EAGAIN").is_launch_failure());
        assert!(Error::EntryNotFound("run_tests".into()).is_launch_failure());
        assert!(Error::ForkServer("closed".into()).is_launch_failure());
        assert!(!Error::LaunchModeUnsupported("bogus".into()).is_launch_failure());
        assert!(!Error::ContextClosed.is_launch_failure());
    }

    #[test]
    fn test_unsupported_mode_message_names_the_mode() {
        let msg = Error::LaunchModeUnsupported("bogus".into()).to_string();
        assert!(msg.contains("'bogus'"));
    }
}
