use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tock_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{kind} ID cannot be empty")]
    EmptyId { kind: &'static str },
    #[error("{kind} not found for id/prefix: {query}")]
    NotFound { kind: &'static str, query: String },
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Invalid time '{0}': expected RFC 3339, YYYY-MM-DD, YYYY-MM-DD HH:MM or now")]
    InvalidTime(String),
    #[error("Could not resolve a {0} directory; pass --db-path / --config")]
    NoDefaultDir(&'static str),
    #[error("No timer is running")]
    TimerIdle,
    #[error("No server configured. Run `tock config set api_base_url <URL>` or set TOCK_API_URL.")]
    RemoteNotConfigured,
}
