//! Retry with exponential backoff for throttled requests.
//!
//! # Structure
//!
//! - `policy` - Retry budget and initial delay ([`RetryPolicy`])
//! - `classify` - Separates throttling failures from everything else
//! - `transport` - The [`RetryingTransport`] decorator

mod classify;
mod policy;
mod transport;

pub use classify::{ClassifiedFailure, classify, is_throttling_status, throttling_status};
pub use policy::{DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS, InvalidConfiguration, RetryPolicy};
pub use transport::{RetriesExhausted, RetryingTransport};
