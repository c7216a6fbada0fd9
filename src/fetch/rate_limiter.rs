//! Per-source fixed-delay rate limiting.
//!
//! Unlike an adaptive, status-code-driven limiter, each source here
//! simply guarantees at least `rate_limit` seconds between consecutive
//! requests to it, matching the static per-source rate the catalog
//! configuration assigns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Tracks the last request time per source key.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    last_request: Arc<RwLock<HashMap<String, Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            last_request: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Wait until at least `rate_limit_secs` have elapsed since the last
    /// request to `source`, then record this request's start time.
    pub async fn wait(&self, source: &str, rate_limit_secs: f64) {
        let min_gap = Duration::from_secs_f64(rate_limit_secs.max(0.0));

        let wait_for = {
            let map = self.last_request.read().await;
            map.get(source)
                .map(|last| {
                    let elapsed = last.elapsed();
                    if elapsed < min_gap {
                        min_gap - elapsed
                    } else {
                        Duration::ZERO
                    }
                })
                .unwrap_or(Duration::ZERO)
        };

        if wait_for > Duration::ZERO {
            tokio::time::sleep(wait_for).await;
        }

        let mut map = self.last_request.write().await;
        map.insert(source.to_string(), Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn test_second_request_waits_minimum_gap() {
        let limiter = RateLimiter::new();
        limiter.wait("doj", 0.1).await;

        let start = StdInstant::now();
        limiter.wait("doj", 0.1).await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_different_sources_do_not_block_each_other() {
        let limiter = RateLimiter::new();
        limiter.wait("doj", 5.0).await;

        let start = StdInstant::now();
        limiter.wait("fbi_vault", 5.0).await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
