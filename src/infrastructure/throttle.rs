use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Client-side request throttle shared by all calls to one provider.
///
/// Keeps outbound request volume under the provider's published limits
/// independently of how many scan workers are in flight.
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RequestThrottle {
    /// # Panics
    /// Panics if `requests_per_minute` is zero.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(requests_per_minute).expect("Requests per minute must be non-zero"),
        );
        RequestThrottle {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until the next request is allowed.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::per_minute(100)
    }
}
