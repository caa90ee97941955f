use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::clock::Clock;
use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::rate_limit::ports::RateLimiter;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    closes_at: DateTime<Utc>,
}

/// Fixed-window limiter for a single process.
///
/// The mutex is held across read-modify-write, so concurrent hits on the
/// same key are counted one at a time.
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn open_window(
        windows: &HashMap<String, Window>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<Window> {
        windows.get(key).copied().filter(|w| w.closes_at > now)
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn allow(&self, key: &str, limit: u32, window: Duration) -> Result<bool, RateLimitError> {
        let now = self.clock.now();
        let window = chrono::Duration::from_std(window)
            .map_err(|e| RateLimitError::StoreError(e.to_string()))?;

        let mut windows = self.windows.lock().await;
        // Closed windows are dropped here, this key's included.
        windows.retain(|_, w| w.closes_at > now);

        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            closes_at: now + window,
        });
        entry.count = entry.count.saturating_add(1);

        Ok(entry.count <= limit)
    }

    async fn remaining(&self, key: &str, limit: u32) -> Result<u32, RateLimitError> {
        let windows = self.windows.lock().await;

        Ok(Self::open_window(&windows, key, self.clock.now())
            .map(|w| limit.saturating_sub(w.count))
            .unwrap_or(limit))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError> {
        let now = self.clock.now();
        let windows = self.windows.lock().await;

        Ok(Self::open_window(&windows, key, now).and_then(|w| (w.closes_at - now).to_std().ok()))
    }
}
