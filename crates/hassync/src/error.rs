//! Error types shared by the session, the sync flows and the CLI.

use std::path::PathBuf;
use std::time::Duration;

/// Failures of the underlying message transport or of the envelopes it carries.
///
/// Any of these aborts the whole operation; nothing received before the
/// failure is trusted.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed by remote")]
    Closed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rename batch was not confirmed")]
    NotConfirmed,

    #[error("snapshot file {0}: {1}")]
    Snapshot(PathBuf, #[source] std::io::Error),

    #[error("filter handoff failed: {0}")]
    Filter(String),
}

/// Coarse classification of [`Error`], for callers that only need to branch
/// on what went wrong rather than report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connection,
    Auth,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::NotConfirmed => ErrorKind::Configuration,
            Error::Connection(_) => ErrorKind::Connection,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Snapshot(..) | Error::Filter(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
