//! Failure shapes raised by a [`Transport`](super::Transport).

use reqwest::StatusCode;
use std::fmt;

/// Transport-level cause of a failed service call.
///
/// Carries the HTTP status when the server answered, and the underlying
/// reqwest error when there is one. A connection failure has no status.
#[derive(Debug)]
pub struct HttpError {
    status: Option<StatusCode>,
    source: Option<reqwest::Error>,
}

impl HttpError {
    /// An error for a response that came back with the given status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            source: None,
        }
    }

    /// Status code of the response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        Self {
            status: error.status(),
            source: Some(error),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.source) {
            (Some(status), Some(source)) => write!(f, "HTTP {}: {}", status, source),
            (Some(status), None) => write!(f, "HTTP {}", status),
            (None, Some(source)) => write!(f, "{}", source),
            (None, None) => write!(f, "HTTP request failed"),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A service call that failed, optionally wrapping the HTTP-level cause.
#[derive(Debug)]
pub struct ServiceError {
    message: String,
    inner: Option<HttpError>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>, inner: Option<HttpError>) -> Self {
        Self {
            message: message.into(),
            inner,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The transport-level error underneath this failure, if any.
    pub fn inner(&self) -> Option<&HttpError> {
        self.inner.as_ref()
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => write!(f, "{}: {}", self.message, inner),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The caller's cancellation token fired before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request was cancelled")
    }
}

impl std::error::Error for Cancelled {}
