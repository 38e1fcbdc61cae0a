//! Retry-with-backoff decorator for HTTP transports talking to rate-limited APIs.
//!
//! Wrap any [`http::Transport`] in a [`retry::RetryingTransport`] and send
//! through it as before. Requests the server throttles (429) or reports as
//! unavailable (503) are resubmitted after an exponentially growing delay;
//! every other failure comes back untouched.

pub mod http;
pub mod retry;

pub use http::{CompletionMode, ReqwestTransport, Transport};
pub use retry::{RetryPolicy, RetryingTransport};
