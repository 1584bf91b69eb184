use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;
use sse::error::Error as SseError;

pub type Result<T> = core::result::Result<T, Error>;

/// Web layer error. Core errors are translated into an `ErrorKind` at the
/// boundary and the kind alone decides the HTTP status.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The request was well-formed JSON but cannot be turned into an event.
    Invalid,
    Internal,
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            ErrorKind::Invalid => {
                warn!("Rejecting request: {:?}", self.source);
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
            }
            ErrorKind::Internal => {
                error!("Internal error: {:?}", self.source);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

// This is where we translate errors from the `sse` core to the `web` layer.
impl From<SseError> for Error {
    fn from(err: SseError) -> Self {
        let error_kind = match err {
            SseError::InvalidEventName(_) => ErrorKind::Invalid,
            SseError::Serialization(_) | SseError::Closed | SseError::Disconnected(_) => {
                ErrorKind::Internal
            }
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
