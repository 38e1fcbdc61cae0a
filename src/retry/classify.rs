//! Decides whether a failed attempt is worth retrying.

use log::{debug, error};
use reqwest::StatusCode;

use crate::http::ServiceError;

/// Outcome of inspecting a failed attempt.
#[derive(Debug)]
pub enum ClassifiedFailure {
    /// The remote service throttled the request or was briefly unavailable.
    Retryable(StatusCode),
    /// Anything else. Holds the original error, untouched.
    Fatal(anyhow::Error),
}

/// Statuses that mean "back off and try again".
pub fn is_throttling_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// Status that makes `error` retryable, if there is one.
///
/// Only a [`ServiceError`] whose inner HTTP error reports 429 or 503 counts.
pub fn throttling_status(error: &anyhow::Error) -> Option<StatusCode> {
    error
        .downcast_ref::<ServiceError>()
        .and_then(ServiceError::inner)
        .and_then(|inner| inner.status())
        .filter(|status| is_throttling_status(*status))
}

/// Classifies an error raised by one send attempt.
pub fn classify(error: anyhow::Error) -> ClassifiedFailure {
    if let Some(status) = throttling_status(&error) {
        return ClassifiedFailure::Retryable(status);
    }

    match error
        .downcast_ref::<ServiceError>()
        .and_then(ServiceError::inner)
    {
        Some(inner) => error!("Service call failed: {:?}", inner),
        None => debug!("Non-retryable error: {:#}", error),
    }

    ClassifiedFailure::Fatal(error)
}
