use std::time::Duration;

use thiserror::Error;

/// Error for rate limiting
#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    #[error("Too many requests, retry after {}s", retry_after.as_secs())]
    Exceeded { retry_after: Duration },

    #[error("Rate limit store error: {0}")]
    StoreError(String),
}
