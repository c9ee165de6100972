//! Rate-limited completion wrapper.
//!
//! Wraps any `CompletionService` with a governor rate limiter so bursts of
//! uncached documents do not exceed a provider's request quota.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::error::Result;
use crate::traits::completion::{CompletionRequest, CompletionService};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A completion service that waits for a permit before every request.
pub struct RateLimitedCompletion<C: CompletionService> {
    inner: C,
    limiter: Arc<DefaultRateLimiter>,
}

impl<C: CompletionService> RateLimitedCompletion<C> {
    /// Allow `requests_per_minute` requests, at least one.
    pub fn per_minute(inner: C, requests_per_minute: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_minute).unwrap_or(nonzero!(1u32));
        Self::with_quota(inner, Quota::per_minute(rate))
    }

    /// Allow `requests_per_second` sustained with bursts up to `burst`.
    pub fn with_burst(inner: C, requests_per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(burst).unwrap_or(rate);
        Self::with_quota(inner, Quota::per_second(rate).allow_burst(burst))
    }

    pub fn with_quota(inner: C, quota: Quota) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CompletionService> CompletionService for RateLimitedCompletion<C> {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.limiter.until_ready().await;
        self.inner.complete(request).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
