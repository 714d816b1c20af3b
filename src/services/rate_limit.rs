use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{config::RateLimitConfig, error::AppResult, storage::redis::RedisClient};

/// Outcome of counting one request against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window closes.
    pub reset_after_secs: u64,
}

/// Fixed-window request counter keyed by client.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, client: &str) -> AppResult<RateDecision>;
}

#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    window: Duration,
    max_requests: u32,
}

impl FixedWindow {
    fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            window: config.window,
            max_requests: config.max_requests,
        }
    }

    fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    /// Index of the window containing `now_secs`, and seconds left in it.
    fn locate(&self, now_secs: u64) -> (u64, u64) {
        let size = self.window_secs();
        (now_secs / size, size - now_secs % size)
    }

    fn decide(&self, count: u64, reset_after_secs: u64) -> RateDecision {
        let limit = self.max_requests;
        RateDecision {
            allowed: count <= u64::from(limit),
            limit,
            remaining: u64::from(limit).saturating_sub(count) as u32,
            reset_after_secs,
        }
    }
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Counters shared across instances through Redis.
pub struct RedisRateLimiter {
    redis: RedisClient,
    policy: FixedWindow,
}

impl RedisRateLimiter {
    pub fn new(redis: RedisClient, config: &RateLimitConfig) -> Self {
        Self {
            redis,
            policy: FixedWindow::from_config(config),
        }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, client: &str) -> AppResult<RateDecision> {
        let (window, reset_after) = self.policy.locate(unix_now_secs());
        let key = format!("{}:{}", client, window);
        let count = self
            .redis
            .incr_window(&key, Duration::from_secs(self.policy.window_secs()))
            .await?;
        Ok(self.policy.decide(count, reset_after))
    }
}

/// In-process counters, for a single instance.
pub struct MemoryRateLimiter {
    policy: FixedWindow,
    counters: Mutex<HashMap<String, (u64, u64)>>,
}

/// Stale windows are pruned once the map grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

impl MemoryRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            policy: FixedWindow::from_config(config),
            counters: Mutex::new(HashMap::new()),
        }
    }

    async fn check_at(&self, client: &str, now_secs: u64) -> RateDecision {
        let (window, reset_after) = self.policy.locate(now_secs);
        let mut counters = self.counters.lock().await;

        if counters.len() > PRUNE_THRESHOLD {
            counters.retain(|_, (w, _)| *w == window);
        }

        let entry = counters.entry(client.to_string()).or_insert((window, 0));
        if entry.0 != window {
            *entry = (window, 0);
        }
        entry.1 += 1;

        self.policy.decide(entry.1, reset_after)
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(&self, client: &str) -> AppResult<RateDecision> {
        Ok(self.check_at(client, unix_now_secs()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> MemoryRateLimiter {
        MemoryRateLimiter::new(&RateLimitConfig {
            enabled: true,
            window: Duration::from_secs(window_secs),
            max_requests,
            trust_proxy: false,
        })
    }

    #[tokio::test]
    async fn allows_up_to_limit_then_rejects() {
        let limiter = limiter(3, 900);
        let now = 9_000;

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_at("1.2.3.4", now).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let decision = limiter.check_at("1.2.3.4", now).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_after_secs, 900);
    }

    #[tokio::test]
    async fn clients_are_counted_separately() {
        let limiter = limiter(1, 60);

        assert!(limiter.check_at("a", 120).await.allowed);
        assert!(limiter.check_at("b", 120).await.allowed);
        assert!(!limiter.check_at("a", 121).await.allowed);
    }

    #[tokio::test]
    async fn new_window_resets_the_count() {
        let limiter = limiter(1, 60);

        assert!(limiter.check_at("a", 59).await.allowed);
        assert!(!limiter.check_at("a", 59).await.allowed);
        let decision = limiter.check_at("a", 60).await;
        assert!(decision.allowed);
        assert_eq!(decision.reset_after_secs, 60);
    }

    #[test]
    fn window_location() {
        let policy = FixedWindow {
            window: Duration::from_secs(900),
            max_requests: 100,
        };
        assert_eq!(policy.locate(0), (0, 900));
        assert_eq!(policy.locate(899), (0, 1));
        assert_eq!(policy.locate(1_800), (2, 900));
    }
}
