//! Error types for the SSE core.

use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by connection handles and event construction.
///
/// None of these ever reach an end user. Sink errors (`Closed`, `Disconnected`)
/// are absorbed by evicting the connection; event errors are logged by the
/// dispatcher or translated into a 422 by the web layer.
#[derive(Debug)]
pub enum Error {
    /// The handle was already closed when a write was attempted.
    Closed,

    /// The remote end is gone: the transport rejected the write or close.
    Disconnected(String),

    /// Event names become an `event:` line, so they may not contain line breaks.
    InvalidEventName(String),

    /// The payload could not be serialized to JSON.
    Serialization(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Closed => write!(f, "Connection already closed"),
            Error::Disconnected(msg) => write!(f, "Connection disconnected: {}", msg),
            Error::InvalidEventName(name) => write!(f, "Invalid event name: {:?}", name),
            Error::Serialization(err) => write!(f, "Failed to serialize event data: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err)
    }
}
