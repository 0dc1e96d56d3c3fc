//! Weighted admission control.
//!
//! The venue budgets requests by weight along two dimensions, per source IP
//! and per account (UID), and reinstates each budget in full once per fixed
//! window. The buckets here mirror that accounting exactly: period refill,
//! not a smoothed rate. Swapping in a leaky-bucket/GCRA limiter would
//! change admission semantics and is deliberately not supported.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sirocco_core::config::Config;
use sirocco_core::error::{ApiError, Error, Result};

/// Poll interval while waiting for tokens. An implementation constant:
/// tuning it only makes sense for smoothed-rate limiters, which this is not.
const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Declared cost of a request along both admission dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weight {
    /// Cost against the per-IP budget.
    pub ip: u32,
    /// Cost against the per-UID budget.
    pub uid: u32,
}

impl Weight {
    /// Creates a new weight pair.
    #[must_use]
    pub const fn new(ip: u32, uid: u32) -> Self {
        Self { ip, uid }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Fixed-window token bucket.
///
/// Invariant: `0 <= tokens <= capacity`. When `now - last_refill` reaches
/// the refill interval, the bucket resets to full capacity; partial refills
/// do not occur. Created full.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_interval: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a new bucket, initially full.
    ///
    /// # Panics
    ///
    /// Panics if `refill_interval` is zero.
    #[must_use]
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        assert!(
            !refill_interval.is_zero(),
            "refill_interval must be non-zero"
        );
        Self {
            capacity,
            refill_interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Attempts to take `n` tokens without waiting.
    ///
    /// A weight above the bucket capacity can never succeed; callers must
    /// keep per-request weights within the configured budget.
    pub fn try_take(&self, n: u32) -> bool {
        debug_assert!(n <= self.capacity, "weight {n} exceeds capacity");
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= n {
            state.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Takes `n` tokens, waiting for the next refill window if necessary.
    ///
    /// Fast-path `try_take`, then polls every 100 ms, re-running the refill
    /// check on each wake.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `n` exceeds the bucket capacity
    /// (such a request could never be satisfied), or
    /// [`Error::Cancelled`] when the token is cancelled while waiting.
    pub async fn take(&self, n: u32, cancel: &CancellationToken) -> Result<()> {
        if n > self.capacity {
            return Err(ApiError::validation(format!(
                "weight {n} exceeds bucket capacity {}",
                self.capacity
            ))
            .into());
        }
        if self.try_take(n) {
            return Ok(());
        }

        let start = tokio::time::Instant::now() + ACQUIRE_POLL_INTERVAL;
        let mut poll = tokio::time::interval_at(start, ACQUIRE_POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                _ = poll.tick() => {
                    if self.try_take(n) {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Returns the tokens currently available, after a refill check.
    #[must_use]
    pub fn available(&self) -> u32 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Returns the bucket capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        if now.duration_since(state.last_refill) >= self.refill_interval {
            state.tokens = self.capacity;
            state.last_refill = now;
        }
    }
}

/// Dual-dimension admission control shared by all concurrent callers.
///
/// Acquisition order is IP first, then UID; an IP token may be held across
/// a UID wait. Both budgets are fixed-window and reset together, so the
/// held token costs at most one window of IP budget.
#[derive(Debug)]
pub struct RateLimiter {
    ip: TokenBucket,
    uid: TokenBucket,
    enabled: bool,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    #[must_use]
    pub fn new(enabled: bool, ip_weight: u32, uid_weight: u32, refill_window: Duration) -> Self {
        Self {
            ip: TokenBucket::new(ip_weight, refill_window),
            uid: TokenBucket::new(uid_weight, refill_window),
            enabled,
        }
    }

    /// Creates a rate limiter from the client configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.enable_rate_limit,
            config.ip_weight,
            config.uid_weight,
            config.refill_window(),
        )
    }

    /// Acquires the declared weights, waiting as needed.
    ///
    /// A zero weight is a no-op on its dimension; when rate limiting is
    /// disabled the call returns immediately. Tokens taken before a
    /// cancellation are not returned; with fixed-window budgets the loss is
    /// bounded to one window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when cancelled while waiting.
    pub async fn acquire(&self, weight: Weight, cancel: &CancellationToken) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if weight.ip > 0 {
            debug!(ip_weight = weight.ip, "acquiring ip weight");
            self.ip.take(weight.ip, cancel).await?;
        }
        if weight.uid > 0 {
            debug!(uid_weight = weight.uid, "acquiring uid weight");
            self.uid.take(weight.uid, cancel).await?;
        }
        Ok(())
    }

    /// Returns the available budget on each dimension as `(ip, uid)`.
    #[must_use]
    pub fn status(&self) -> (u32, u32) {
        (self.ip.available(), self.uid.available())
    }

    /// Returns true if admission control is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
