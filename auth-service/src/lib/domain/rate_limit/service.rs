use std::sync::Arc;

use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::rate_limit::models::RateLimitAction;
use crate::domain::rate_limit::models::RateLimitPolicy;
use crate::domain::rate_limit::ports::RateLimiter;

/// Applies one policy to every gated action.
pub struct RateLimitGate<RL>
where
    RL: RateLimiter,
{
    limiter: Arc<RL>,
    policy: RateLimitPolicy,
}

impl<RL> RateLimitGate<RL>
where
    RL: RateLimiter,
{
    pub fn new(limiter: Arc<RL>, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }

    /// Count an attempt of `action` from `client`.
    ///
    /// # Errors
    /// * `Exceeded` - Over the limit; `retry_after` is the rest of the window
    /// * `StoreError` - Backing store unavailable
    pub async fn check(
        &self,
        action: RateLimitAction,
        client: &str,
    ) -> Result<(), RateLimitError> {
        let key = action.key(client);

        if self
            .limiter
            .allow(&key, self.policy.max_attempts, self.policy.window)
            .await?
        {
            return Ok(());
        }

        let retry_after = self
            .limiter
            .ttl(&key)
            .await?
            .unwrap_or(self.policy.window);

        tracing::warn!(
            action = %action,
            client,
            retry_after = retry_after.as_secs(),
            "Rate limit exceeded"
        );

        Err(RateLimitError::Exceeded { retry_after })
    }

    /// Attempts `client` has left for `action` in the current window.
    pub async fn remaining(
        &self,
        action: RateLimitAction,
        client: &str,
    ) -> Result<u32, RateLimitError> {
        self.limiter
            .remaining(&action.key(client), self.policy.max_attempts)
            .await
    }
}
