//! Error types for tock-core

use thiserror::Error;

/// Result type alias using tock-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tock-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No connectivity is observable; the remote was not contacted
    #[error("Network unavailable")]
    NetworkUnavailable,

    /// The remote was reachable but rejected or failed the request
    #[error("Remote request failed{}: {message}", status_suffix(.status))]
    RemoteRequestFailed {
        /// HTTP status when one was received
        status: Option<u16>,
        /// Server-provided or transport error message
        message: String,
    },

    /// The remote has no record with the given id
    #[error("Remote record not found: {0}")]
    RemoteNotFound(String),

    /// Local store error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Local record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|status| format!(" ({status})")).unwrap_or_default()
}

impl Error {
    /// Whether this error came from the remote side (or its absence).
    ///
    /// Reconciliation skips items failing with these; anything else is a
    /// local failure and aborts the current operation.
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable | Self::RemoteRequestFailed { .. } | Self::RemoteNotFound(_)
        )
    }
}
