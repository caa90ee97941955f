use std::time::Duration;

use async_trait::async_trait;

use crate::domain::rate_limit::errors::RateLimitError;

/// Atomic fixed-window counter.
#[async_trait]
pub trait RateLimiter: Send + Sync + 'static {
    /// Count one hit on `key` and report whether it is within `limit`.
    ///
    /// The first hit in a window starts the window. Increment and compare
    /// are one indivisible step per key: concurrent callers never both see
    /// the same count.
    ///
    /// # Returns
    /// True iff the post-increment count is at most `limit`
    ///
    /// # Errors
    /// * `StoreError` - Backing store unavailable
    async fn allow(&self, key: &str, limit: u32, window: Duration) -> Result<bool, RateLimitError>;

    /// Hits left in the current window. Read-only.
    async fn remaining(&self, key: &str, limit: u32) -> Result<u32, RateLimitError>;

    /// Time until the current window closes, if one is open. Read-only.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError>;
}
