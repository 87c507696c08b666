//! Error types for wretch.

use std::fmt;

use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A runtime primitive was needed but never registered.
    #[error("{0} is not defined")]
    MissingPolyfill(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("catcher failed: {0}")]
    Catcher(String),
}

impl Error {
    /// HTTP status of a status error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http(e) => Some(e.status),
            _ => None,
        }
    }

    /// Kind of a transport error.
    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            Error::Transport(e) => Some(e.kind()),
            _ => None,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::Abort))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed transport call.
///
/// The names mirror the error names a fetch implementation reports, so a
/// catcher can be registered for `"FetchError"` or `"AbortError"` directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network failure, or an unreadable response body.
    Fetch,
    /// The request signal was aborted.
    Abort,
    /// Any other kind a custom transport reports.
    Other(String),
}

impl ErrorKind {
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Fetch => "FetchError",
            ErrorKind::Abort => "AbortError",
            ErrorKind::Other(name) => name,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for ErrorKind {
    fn from(name: &str) -> Self {
        match name {
            "FetchError" => ErrorKind::Fetch,
            "AbortError" => ErrorKind::Abort,
            other => ErrorKind::Other(other.to_owned()),
        }
    }
}

/// The transport call itself failed: no response was produced, or its body
/// could not be read.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TransportError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }

    pub fn abort() -> Self {
        Self::new(ErrorKind::Abort, "the operation was aborted")
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A response arrived but its status was not ok.
///
/// Depending on the configured [`ErrorType`](crate::ErrorType), the
/// response body is kept either as `text` or parsed into `json`. When the
/// body is not valid JSON, `json` stays empty and the raw body lands in
/// `text`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
    pub text: Option<String>,
    pub json: Option<Value>,
    pub url: String,
    pub headers: Vec<(String, String)>,
}
