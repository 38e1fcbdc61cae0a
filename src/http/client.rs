//! Transport backed by a reqwest [`Client`].

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::error::{Cancelled, HttpError, ServiceError};
use super::{CompletionMode, Request, Response, Transport};

/// Sends requests through a reqwest [`Client`].
///
/// Non-success statuses are raised as a [`ServiceError`] wrapping an
/// [`HttpError`] that carries the status. Connection and body-read failures
/// are raised the same way, without a status.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request, cancel), fields(method = %request.method(), url = %request.url()))]
    async fn send(
        &self,
        request: &Request,
        mode: CompletionMode,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let attempt = request
            .try_clone()
            .ok_or_else(|| anyhow!("Request body cannot be resubmitted"))?;

        debug!("{} {} ({:?})...", request.method(), request.url(), mode);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            result = self.client.execute(attempt) => result.map_err(|e| {
                ServiceError::new("Failed to send request", Some(HttpError::from(e)))
            })?,
        };

        let response = response.error_for_status().map_err(|e| {
            ServiceError::new("Service returned an error status", Some(HttpError::from(e)))
        })?;

        match mode {
            CompletionMode::ResponseHeadersRead => Ok(response),
            CompletionMode::ResponseContentRead => buffer_body(response, cancel).await,
        }
    }
}

/// Reads the whole body and rebuilds the response around it.
///
/// Status, version and headers are kept. The rebuilt response does not
/// report the original URL.
async fn buffer_body(response: Response, cancel: &CancellationToken) -> Result<Response> {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Cancelled.into()),
        result = response.bytes() => result.map_err(|e| {
            ServiceError::new("Failed to read response body", Some(HttpError::from(e)))
        })?,
    };

    debug!("Buffered {} bytes", body.len());

    let mut buffered = ::http::Response::new(body);
    *buffered.status_mut() = status;
    *buffered.version_mut() = version;
    *buffered.headers_mut() = headers;

    Ok(Response::from(buffered))
}
