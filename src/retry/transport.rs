//! Transport decorator that retries throttled requests with exponential backoff.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use std::fmt;
use tokio_util::sync::CancellationToken;

use super::classify::{ClassifiedFailure, classify};
use super::policy::RetryPolicy;
use crate::http::{Cancelled, CompletionMode, Request, Response, Transport};

/// Every attempt allowed by the policy was throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetriesExhausted {
    pub max_attempts: u32,
}

impl fmt::Display for RetriesExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Maximum retry attempts {} has been attempted",
            self.max_attempts
        )
    }
}

impl std::error::Error for RetriesExhausted {}

/// Wraps a [`Transport`] and retries requests the remote service throttled.
///
/// Only a 429 or 503 raised as a [`ServiceError`](crate::http::ServiceError)
/// is retried; every other failure is returned unchanged after one attempt.
/// Between attempts the task sleeps for the current delay, which starts at
/// the policy's initial delay and doubles each time. The sleep ends early
/// with [`Cancelled`] if the caller's token fires.
///
/// Attempt state lives in each `send` call, so one instance can serve many
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Wraps `inner` with [`RetryPolicy::default`].
    pub fn with_defaults(inner: T) -> Self {
        Self::new(inner, RetryPolicy::default())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    #[tracing::instrument(skip(self, request, cancel), fields(url = %request.url()))]
    async fn send(
        &self,
        request: &Request,
        mode: CompletionMode,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let max_attempts = self.policy.max_attempts();
        let mut attempts_made = 0;

        while attempts_made < max_attempts {
            let error = match self.inner.send(request, mode, cancel).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let status = match classify(error) {
                ClassifiedFailure::Fatal(e) => return Err(e),
                ClassifiedFailure::Retryable(status) => status,
            };

            attempts_made += 1;
            if attempts_made == max_attempts {
                debug!(
                    "attempt {}/{} throttled ({}), giving up",
                    attempts_made, max_attempts, status
                );
                break;
            }

            let delay = self.policy.delay_for_retry(attempts_made - 1);
            warn!(
                "Request throttled ({}), retrying in {}ms (attempt {}/{})...",
                status,
                delay.as_millis(),
                attempts_made,
                max_attempts
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled.into()),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Err(RetriesExhausted { max_attempts }.into())
    }
}
