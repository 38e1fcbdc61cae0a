//! HTTP transport abstraction.
//!
//! A [`Transport`] sends one request and yields one response or an error.
//! Failures a remote service is responsible for are raised as
//! [`ServiceError`], optionally wrapping an [`HttpError`] with the status.

mod client;
mod error;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use client::ReqwestTransport;
pub use error::{Cancelled, HttpError, ServiceError};
pub use reqwest::{Request, Response};

/// When a send is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Complete once the whole body has been read.
    #[default]
    ResponseContentRead,
    /// Complete as soon as the response headers have been received.
    ResponseHeadersRead,
}

/// Sends a single HTTP request.
///
/// The request is borrowed so the same request can be submitted more than
/// once; implementations must not alter it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &Request,
        mode: CompletionMode,
        cancel: &CancellationToken,
    ) -> Result<Response>;
}
