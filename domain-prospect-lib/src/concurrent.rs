//! Admission control shared by all in-flight lookups.
//!
//! [`RateLimiter`] is a token bucket that caps the sustained lookup rate
//! across every worker, plus a global pause that the engine raises when the
//! registry reports rate limiting. Concurrency itself is bounded separately
//! by a semaphore owned by the engine.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Shortest sleep between bucket polls.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Tolerance for floating point refill arithmetic.
const TOKEN_EPSILON: f64 = 1e-9;

/// Longest single wait the engine will schedule. Also the upper bound
/// accepted for timeouts and backoff settings.
pub const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Slowest accepted rate: one lookup per [`MAX_DELAY`].
pub const MIN_RATE: f64 = 1.0 / 86_400.0;

/// `now + delay`, with `delay` clamped to [`MAX_DELAY`].
pub(crate) fn deadline_after(now: Instant, delay: Duration) -> Instant {
    let delay = delay.min(MAX_DELAY);
    now.checked_add(delay).unwrap_or(now)
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    capacity: f64,
    rate: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take a token, or say how long until one is available.
    fn try_take(&mut self, now: Instant) -> Option<Duration> {
        self.refill(now);
        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            None
        } else {
            let wait = Duration::try_from_secs_f64((1.0 - self.tokens) / self.rate)
                .unwrap_or(MAX_DELAY)
                .min(MAX_DELAY);
            Some(wait.max(MIN_WAIT))
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    bucket: Option<Bucket>,
    paused_until: Option<Instant>,
    penalty: Duration,
}

/// Global token bucket with an escalating rate-limit pause.
///
/// The internal lock is never held across an `.await`.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
    base_penalty: Duration,
    max_penalty: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` acquisitions per second with up to
    /// `burst` back to back. `None` disables the rate ceiling; the pause
    /// still applies.
    pub fn new(rate: Option<f64>, burst: u32) -> Self {
        let bucket = rate.map(|rate| {
            let capacity = f64::from(burst.max(1));
            Bucket {
                tokens: capacity,
                capacity,
                rate,
                last_refill: Instant::now(),
            }
        });

        Self {
            state: Mutex::new(LimiterState {
                bucket,
                paused_until: None,
                penalty: Duration::ZERO,
            }),
            base_penalty: Duration::from_millis(500),
            max_penalty: Duration::from_secs(30),
        }
    }

    /// A limiter that never waits unless penalized.
    pub fn unlimited() -> Self {
        Self::new(None, 1)
    }

    /// Set the first pause length and the ceiling it doubles up to.
    pub fn with_penalty(mut self, base: Duration, max: Duration) -> Self {
        self.base_penalty = base;
        self.max_penalty = max.max(base);
        self
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until a lookup may start, then consume a token.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.lock();
                let now = Instant::now();

                match state.paused_until {
                    Some(until) if until > now => Some(until - now),
                    _ => match state.bucket.as_mut() {
                        Some(bucket) => bucket.try_take(now),
                        None => None,
                    },
                }
            };

            match wait {
                Some(wait) => tokio::time::sleep(wait).await,
                None => return,
            }
        }
    }

    /// Pause all admissions after a rate-limited response.
    ///
    /// The pause starts at the base penalty and doubles on every
    /// consecutive call, capped at the maximum. Returns the pause applied.
    pub fn penalize(&self) -> Duration {
        let mut state = self.lock();
        let penalty = if state.penalty.is_zero() {
            self.base_penalty
        } else {
            state.penalty.saturating_mul(2).min(self.max_penalty)
        };
        state.penalty = penalty;

        let until = deadline_after(Instant::now(), penalty);
        state.paused_until = Some(match state.paused_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });

        tracing::warn!(?penalty, "registry rate limit, pausing admissions");
        penalty
    }

    /// Reset pause escalation after a response that was not rate limited.
    ///
    /// A pause already in effect runs to its end.
    pub fn relax(&self) {
        let mut state = self.lock();
        if !state.penalty.is_zero() {
            tracing::debug!("rate limit pressure cleared");
            state.penalty = Duration::ZERO;
        }
    }

    /// Remaining length of the current pause, if any.
    pub fn paused_for(&self) -> Option<Duration> {
        let state = self.lock();
        let now = Instant::now();
        state
            .paused_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}
