//! Error types for tally-core

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the tally-core library
///
/// Only local-state problems are represented here. Network failures are
/// reported as [`TransportError`] and never leave the dispatcher.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted identity file exists but cannot be understood
    #[error("identity file {} is corrupt: {message}", path.display())]
    ConfigCorrupt { path: PathBuf, message: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The process-wide dispatcher was already initialized
    #[error("tally is already configured; the user agent can only be set once per process")]
    AlreadyConfigured,
}

/// Failure to deliver one event to the collector
///
/// Absorbed at the dispatcher boundary and turned into a dropped event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The collector did not answer within the event timeout
    #[error("request timed out")]
    Timeout,

    /// The collector could not be reached
    #[error("connection failed: {0}")]
    Connect(String),

    /// The collector answered with a non-success status
    #[error("collector returned status {0}")]
    Status(u16),

    /// Any other request failure
    #[error("request failed: {0}")]
    Request(String),

    /// The background task finished without reporting a result
    #[error("dispatch task aborted")]
    Aborted,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Result type alias for tally-core
pub type Result<T> = std::result::Result<T, Error>;
