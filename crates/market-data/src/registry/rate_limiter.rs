//! Sliding-window rate limiters for exchange providers.
//!
//! Each provider owns one limiter. Before every outbound call the adapter asks
//! [`RateLimiter::is_safe`]; a `false` answer means "back off and ask again",
//! not an error. Exceeding the limit never raises.
//!
//! The windowed limiters keep the timestamps of recent hits. `is_safe` records
//! the current attempt, drops hits that fell out of the trailing window and
//! compares what remains against the maximum. The attempt is recorded even
//! when the answer is `false`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};

/// Shortest pause [`RateLimiter::limit`] waits for on a windowed limiter.
const MIN_LIMIT_PAUSE: Duration = Duration::from_millis(50);

/// Longest pause [`RateLimiter::limit`] waits for on a windowed limiter.
const MAX_LIMIT_PAUSE: Duration = Duration::from_secs(1);

/// Caller information a limiter may use to pick a policy tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimitContext {
    /// Whether the request carries API credentials.
    pub authenticated: bool,
}

impl RateLimitContext {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
        }
    }

    pub fn authenticated() -> Self {
        Self {
            authenticated: true,
        }
    }
}

/// Per-provider request throttling policy.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record an attempt and report whether it fits within the policy.
    fn is_safe(&self, context: &RateLimitContext) -> bool;

    /// How long until an attempt would be safe. Does not record anything.
    fn time_until_safe(&self, context: &RateLimitContext) -> Duration {
        let _ = context;
        Duration::ZERO
    }

    /// Wait briefly before the caller asks again.
    async fn limit(&self);
}

/// Wait until `limiter` admits a request for `context`.
///
/// Sleeps for the limiter's own estimate first so that waiting does not keep
/// recording rejected attempts into the window.
pub async fn throttle(limiter: &dyn RateLimiter, context: &RateLimitContext) {
    loop {
        let wait = limiter.time_until_safe(context);
        if wait > Duration::ZERO {
            debug!("Rate limiter: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        if limiter.is_safe(context) {
            return;
        }

        limiter.limit().await;
    }
}

/// Maximum hits within a trailing window.
///
/// A policy always admits at least one request per window; a maximum of zero
/// is treated as one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max_requests: usize,
    pub window: Duration,
}

impl WindowPolicy {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        if max_requests == 0 {
            warn!("Rate limit of zero requests per {:?} raised to one", window);
        }
        Self {
            max_requests: max_requests.max(1),
            window,
        }
    }

    /// Requests admitted per window, never zero.
    fn admitted(&self) -> usize {
        self.max_requests.max(1)
    }
}

/// Sliding-window limiter with an optional, stricter anonymous tier.
pub struct SlidingWindowRateLimiter {
    anonymous: WindowPolicy,
    authenticated: WindowPolicy,
    hits: Mutex<VecDeque<Instant>>,
    pause: Duration,
}

impl SlidingWindowRateLimiter {
    /// One policy for every caller.
    pub fn new(policy: WindowPolicy) -> Self {
        Self::with_tiers(policy, policy)
    }

    /// Separate policies for anonymous and authenticated callers.
    pub fn with_tiers(anonymous: WindowPolicy, authenticated: WindowPolicy) -> Self {
        let slowest = anonymous.window / anonymous.admitted() as u32;
        Self {
            anonymous,
            authenticated,
            hits: Mutex::new(VecDeque::new()),
            pause: slowest.clamp(MIN_LIMIT_PAUSE, MAX_LIMIT_PAUSE),
        }
    }

    /// `requests` per `minutes`-minute window.
    pub fn per_minute(requests: usize, minutes: u64) -> Self {
        Self::new(WindowPolicy::new(requests, Duration::from_secs(minutes * 60)))
    }

    /// Per-minute limits with a stricter tier for calls without credentials.
    pub fn per_minute_tiered(
        anonymous_requests: usize,
        anonymous_minutes: u64,
        requests: usize,
        minutes: u64,
    ) -> Self {
        Self::with_tiers(
            WindowPolicy::new(anonymous_requests, Duration::from_secs(anonymous_minutes * 60)),
            WindowPolicy::new(requests, Duration::from_secs(minutes * 60)),
        )
    }

    /// `requests` per `seconds`-second window.
    pub fn per_second(requests: usize, seconds: u64) -> Self {
        Self::new(WindowPolicy::new(requests, Duration::from_secs(seconds)))
    }

    fn policy(&self, context: &RateLimitContext) -> WindowPolicy {
        if context.authenticated {
            self.authenticated
        } else {
            self.anonymous
        }
    }

    /// Lock the hit list, recovering from poison if necessary.
    ///
    /// The worst case after a poisoned lock is a slightly wrong hit count.
    fn lock_hits(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.hits.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter hit list mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// [`RateLimiter::is_safe`] evaluated at an explicit instant.
    pub fn is_safe_at(&self, context: &RateLimitContext, now: Instant) -> bool {
        let policy = self.policy(context);
        let mut hits = self.lock_hits();

        hits.push_back(now);
        hits.retain(|hit| now.saturating_duration_since(*hit) < policy.window);

        hits.len() <= policy.admitted()
    }

    /// [`RateLimiter::time_until_safe`] evaluated at an explicit instant.
    pub fn time_until_safe_at(&self, context: &RateLimitContext, now: Instant) -> Duration {
        let policy = self.policy(context);
        let hits = self.lock_hits();

        let mut live: Vec<Instant> = hits
            .iter()
            .copied()
            .filter(|hit| now.saturating_duration_since(*hit) < policy.window)
            .collect();

        // The next attempt adds one hit of its own.
        let admitted = policy.admitted();
        if live.len() < admitted {
            return Duration::ZERO;
        }

        live.sort();
        let must_expire = live.len() + 1 - admitted;
        let oldest_needed = live[must_expire - 1];
        (oldest_needed + policy.window).saturating_duration_since(now)
    }

    /// Number of hits currently inside the window for `context`.
    pub fn hit_count(&self, context: &RateLimitContext, now: Instant) -> usize {
        let policy = self.policy(context);
        self.lock_hits()
            .iter()
            .filter(|hit| now.saturating_duration_since(**hit) < policy.window)
            .count()
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowRateLimiter {
    fn is_safe(&self, context: &RateLimitContext) -> bool {
        self.is_safe_at(context, Instant::now())
    }

    fn time_until_safe(&self, context: &RateLimitContext) -> Duration {
        self.time_until_safe_at(context, Instant::now())
    }

    async fn limit(&self) {
        tokio::time::sleep(self.pause).await;
    }
}

/// Policy for exchanges without documented limits: always safe.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRateLimits;

#[async_trait]
impl RateLimiter for NoRateLimits {
    fn is_safe(&self, _context: &RateLimitContext) -> bool {
        true
    }

    async fn limit(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_window_admits_exactly_max_requests() {
        let limiter = SlidingWindowRateLimiter::per_minute(5, 1);
        let ctx = RateLimitContext::default();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.is_safe_at(&ctx, now));
        }
        assert!(!limiter.is_safe_at(&ctx, now));
    }

    #[test]
    fn test_hits_expire_after_window() {
        let limiter = SlidingWindowRateLimiter::per_minute(3, 2);
        let ctx = RateLimitContext::default();
        let start = Instant::now();

        for _ in 0..4 {
            limiter.is_safe_at(&ctx, start);
        }
        assert!(!limiter.is_safe_at(&ctx, start + Duration::from_secs(60)));

        // The rejected attempt at +60s is still inside the window at +120s.
        let later = start + Duration::from_secs(2 * 60);
        assert!(limiter.is_safe_at(&ctx, later));
        assert_eq!(limiter.hit_count(&ctx, later), 2);

        let much_later = start + Duration::from_secs(5 * 60);
        assert!(limiter.is_safe_at(&ctx, much_later));
        assert_eq!(limiter.hit_count(&ctx, much_later), 1);
    }

    #[test]
    fn test_rejected_attempts_are_recorded() {
        let limiter = SlidingWindowRateLimiter::per_second(1, 1);
        let ctx = RateLimitContext::default();
        let now = Instant::now();

        assert!(limiter.is_safe_at(&ctx, now));
        assert!(!limiter.is_safe_at(&ctx, now));
        assert_eq!(limiter.hit_count(&ctx, now), 2);
    }

    #[test]
    fn test_anonymous_tier_is_stricter() {
        let limiter = SlidingWindowRateLimiter::per_minute_tiered(1, 1, 10, 1);
        let now = Instant::now();

        assert!(limiter.is_safe_at(&RateLimitContext::anonymous(), now));
        assert!(!limiter.is_safe_at(&RateLimitContext::anonymous(), now));
        assert!(limiter.is_safe_at(&RateLimitContext::authenticated(), now));
    }

    #[test]
    fn test_time_until_safe() {
        let limiter = SlidingWindowRateLimiter::per_second(2, 10);
        let ctx = RateLimitContext::default();
        let start = Instant::now();

        assert_eq!(limiter.time_until_safe_at(&ctx, start), Duration::ZERO);
        limiter.is_safe_at(&ctx, start);
        limiter.is_safe_at(&ctx, start + Duration::from_secs(4));

        let wait = limiter.time_until_safe_at(&ctx, start + Duration::from_secs(5));
        assert_eq!(wait, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_maximum_admits_one_request() {
        let ctx = RateLimitContext::anonymous();
        let start = Instant::now();

        let limiter = SlidingWindowRateLimiter::per_minute(0, 1);
        assert_eq!(limiter.time_until_safe_at(&ctx, start), Duration::ZERO);
        assert!(limiter.is_safe_at(&ctx, start));
        assert!(!limiter.is_safe_at(&ctx, start));
        assert_eq!(
            limiter.time_until_safe_at(&ctx, start),
            Duration::from_secs(60)
        );

        // A policy built without the constructor behaves the same way.
        let raw = WindowPolicy {
            max_requests: 0,
            window: Duration::from_secs(1),
        };
        let limiter = SlidingWindowRateLimiter::new(raw);
        assert_eq!(limiter.time_until_safe_at(&ctx, start), Duration::ZERO);
        assert!(limiter.is_safe_at(&ctx, start));
        assert_eq!(
            limiter.time_until_safe_at(&ctx, start),
            Duration::from_secs(1)
        );
        assert_eq!(WindowPolicy::new(0, Duration::from_secs(1)).max_requests, 1);
    }

    #[tokio::test]
    async fn test_throttle_terminates_for_zero_maximum() {
        let limiter = SlidingWindowRateLimiter::per_second(0, 1);
        let ctx = RateLimitContext::default();

        tokio::time::timeout(Duration::from_secs(5), throttle(&limiter, &ctx))
            .await
            .unwrap();
    }

    #[test]
    fn test_no_limits_is_always_safe() {
        let limiter = NoRateLimits;
        let ctx = RateLimitContext::default();
        for _ in 0..10_000 {
            assert!(limiter.is_safe(&ctx));
        }
    }

    #[tokio::test]
    async fn test_throttle_waits_for_window() {
        let limiter: Arc<dyn RateLimiter> =
            Arc::new(SlidingWindowRateLimiter::new(WindowPolicy::new(
                1,
                Duration::from_millis(100),
            )));
        let ctx = RateLimitContext::default();

        throttle(limiter.as_ref(), &ctx).await;
        let start = Instant::now();
        throttle(limiter.as_ref(), &ctx).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_concurrent_hits_are_all_counted() {
        let limiter = Arc::new(SlidingWindowRateLimiter::per_minute(1000, 1));
        let ctx = RateLimitContext::default();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        limiter.is_safe(&ctx);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(limiter.hit_count(&ctx, Instant::now()), 400);
    }
}
