//! Token-bucket pacing for provider calls.

use crate::{Error, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterConfig {
    /// Maximum number of tokens the bucket holds (burst size).
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_per_sec: f64,
}

impl RateLimiterConfig {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Result<Self> {
        if !capacity.is_finite() || capacity < 1.0 {
            return Err(Error::Config(format!(
                "Rate limit capacity must be at least 1, got {}",
                capacity
            )));
        }
        if !refill_per_sec.is_finite() || refill_per_sec < 0.0 {
            return Err(Error::Config(format!(
                "Rate limit refill rate must be non-negative, got {}",
                refill_per_sec
            )));
        }
        Ok(Self {
            capacity,
            refill_per_sec,
        })
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Token bucket shared by every attempt the executor makes.
///
/// The bucket starts full. A refill rate of zero disables limiting.
#[derive(Debug)]
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        let bucket = Mutex::new(Bucket {
            tokens: cfg.capacity,
            last: Instant::now(),
        });
        Self { cfg, bucket }
    }

    fn refill(cfg: &RateLimiterConfig, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last).as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * cfg.refill_per_sec).min(cfg.capacity);
            bucket.last = now;
        }
    }

    /// Take one token, sleeping until one is available.
    pub async fn acquire(&self) {
        if self.cfg.refill_per_sec <= 0.0 {
            return;
        }

        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                Self::refill(&self.cfg, &mut bucket);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                let missing = 1.0 - bucket.tokens;
                Duration::from_secs_f64(missing / self.cfg.refill_per_sec)
            };

            tracing::debug!("Rate limiter waiting {:?} for a token", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available, after refilling.
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        Self::refill(&self.cfg, &mut bucket);
        bucket.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(RateLimiterConfig::new(2.0, 1.0).is_ok());
        assert!(RateLimiterConfig::new(0.5, 1.0).is_err());
        assert!(RateLimiterConfig::new(1.0, -1.0).is_err());
        assert!(RateLimiterConfig::new(f64::NAN, 1.0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_immediate() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(3.0, 1.0).unwrap());
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_refill_when_empty() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(1.0, 0.5).unwrap());
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;

        // One token at 0.5/s takes two seconds to refill.
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_caps_at_capacity() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(2.0, 10.0).unwrap());
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(limiter.available().await, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_disables_limiting() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(1.0, 0.0).unwrap());
        let start = Instant::now();

        for _ in 0..10 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
