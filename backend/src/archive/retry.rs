//! Bounded retry around any [`ArchiveSearch`].
//!
//! Only errors flagged retryable (connection resets, timeouts, 5xx/429) are
//! retried. The delay doubles per attempt up to `max_delay`, plus up to half of
//! it again as random jitter.

use async_trait::async_trait;
use log::warn;
use rand::Rng;
use std::time::Duration;

use super::error::ArchiveResult;
use super::search::{ArchiveSearch, SearchQuery};
use crate::models::SearchResult;

/// Retry limits for archive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure; 0 disables retries
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Backoff plus a uniform jitter of up to half the backoff.
    pub fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        let spread = backoff.as_millis() as u64 / 2;
        if spread == 0 {
            return backoff;
        }
        let jitter = rand::rng().random_range(0..=spread);
        backoff + Duration::from_millis(jitter)
    }
}

/// Wraps a search capability with a [`RetryPolicy`].
pub struct RetryingSearch<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ArchiveSearch> RetryingSearch<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ArchiveSearch> ArchiveSearch for RetryingSearch<S> {
    async fn search(&self, query: &SearchQuery) -> ArchiveResult<SearchResult> {
        let mut attempt = 0;
        loop {
            match self.inner.search(query).await {
                Err(err) if err.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_with_jitter(attempt);
                    attempt += 1;
                    warn!(
                        "{} search for {} failed (attempt {}/{}), retrying in {:?}: {}",
                        self.inner.name(),
                        query.interval,
                        attempt,
                        self.policy.max_retries + 1,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
