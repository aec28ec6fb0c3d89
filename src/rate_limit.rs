//! Fixed-window rate limiting
//!
//! An explicit, injectable counter store with per-key TTL windows. The
//! turn-handling boundary constructs one and shares it across requests;
//! there is no ambient global state.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the current window resets
    pub reset_in: Duration,
}

struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Shared per-key request counter with fixed-window reset
pub struct RateLimiter {
    entries: Mutex<HashMap<String, WindowEntry>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Count one request against `key` and decide whether it is allowed
    ///
    /// An expired window resets transparently on the next check.
    pub async fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(key) {
            Some(entry) if now < entry.reset_at => {
                if entry.count >= self.max_requests {
                    return RateDecision {
                        allowed: false,
                        remaining: 0,
                        reset_in: entry.reset_at - now,
                    };
                }
                entry.count += 1;
                RateDecision {
                    allowed: true,
                    remaining: self.max_requests - entry.count,
                    reset_in: entry.reset_at - now,
                }
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    WindowEntry {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                RateDecision {
                    allowed: true,
                    remaining: self.max_requests.saturating_sub(1),
                    reset_in: self.window,
                }
            }
        }
    }

    /// Drop all expired windows; keeps the map from growing unbounded
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.lock().await.retain(|_, e| now < e.reset_at);
    }

    /// Number of keys with a live window
    pub async fn active_keys(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| now < e.reset_at)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_limit_then_blocks() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        for remaining in [2, 1, 0] {
            let decision = limiter.check("u1").await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, remaining);
        }

        let decision = limiter.check("u1").await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset_in <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn keys_are_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("u1").await.allowed);
        assert!(!limiter.check("u1").await.allowed);
        assert!(limiter.check("u2").await.allowed);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("u1").await.allowed);
        assert!(!limiter.check("u1").await.allowed);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("u1").await.allowed);
    }

    #[tokio::test]
    async fn purge_drops_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10));
        limiter.check("u1").await;
        limiter.check("u2").await;
        assert_eq!(limiter.active_keys().await, 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        limiter.purge_expired().await;
        assert_eq!(limiter.active_keys().await, 0);
    }
}
