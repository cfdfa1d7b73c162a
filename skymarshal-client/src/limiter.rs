use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_MAX_POINTS: usize = 3000;
pub const DEFAULT_WINDOW_SECONDS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    pub points_used: usize,
    pub points_remaining: usize,
    pub max_points: usize,
    pub requests_in_window: usize,
}

/// Points-based sliding-window rate limiter for the Bluesky API
/// (3000 points/hour unauthenticated, 5000 authenticated).
///
/// The ledger mutex is only held while pruning and booking; callers that must
/// wait sleep with the lock released so unrelated requests keep flowing.
pub struct RateLimiter {
    max_points: usize,
    window: Duration,
    ledger: Mutex<VecDeque<(Instant, usize)>>,
}

impl RateLimiter {
    pub fn new(max_points: usize, window_seconds: u64) -> Self {
        RateLimiter {
            max_points,
            window: Duration::from_secs(window_seconds),
            ledger: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until `points_cost` can be booked without exceeding the window
    /// ceiling, then book it.
    pub async fn acquire(&self, points_cost: usize) {
        loop {
            let wait = {
                let mut ledger = self.ledger.lock().await;
                let now = Instant::now();
                while let Some((ts, _)) = ledger.front() {
                    if now.duration_since(*ts) > self.window {
                        ledger.pop_front();
                    } else {
                        break;
                    }
                }
                let current: usize = ledger.iter().map(|(_, cost)| cost).sum();
                if current + points_cost <= self.max_points {
                    ledger.push_back((now, points_cost));
                    return;
                }
                match ledger.front() {
                    Some((oldest, _)) => {
                        let elapsed = now.duration_since(*oldest);
                        self.window.saturating_sub(elapsed) + Duration::from_secs(1)
                    }
                    // Single request larger than the ceiling; book it anyway
                    // rather than deadlocking.
                    None => {
                        ledger.push_back((now, points_cost));
                        return;
                    }
                }
            };
            tracing::warn!(
                "rate limit window full, sleeping {:.1}s before retrying acquisition",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn stats(&self) -> RateLimiterStats {
        let ledger = self.ledger.lock().await;
        let now = Instant::now();
        let recent: Vec<&(Instant, usize)> = ledger
            .iter()
            .filter(|(ts, _)| now.duration_since(*ts) <= self.window)
            .collect();
        let points_used: usize = recent.iter().map(|(_, cost)| cost).sum();
        RateLimiterStats {
            points_used,
            points_remaining: self.max_points.saturating_sub(points_used),
            max_points: self.max_points,
            requests_in_window: recent.len(),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(DEFAULT_MAX_POINTS, DEFAULT_WINDOW_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_under_ceiling_does_not_block() {
        let limiter = RateLimiter::new(10, 3600);
        for _ in 0..10 {
            limiter.acquire(1).await;
        }
        let stats = limiter.stats().await;
        assert_eq!(stats.points_used, 10);
        assert_eq!(stats.points_remaining, 0);
        assert_eq!(stats.requests_in_window, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_oldest_to_expire() {
        let limiter = RateLimiter::new(2, 60);
        limiter.acquire(2).await;

        let acquired = tokio::spawn(async move {
            limiter.acquire(1).await;
            limiter.stats().await
        });
        // With the window full the third acquisition must sleep until the
        // first booking leaves the window.
        tokio::time::sleep(Duration::from_secs(62)).await;
        let stats = acquired.await.unwrap();
        assert_eq!(stats.points_used, 1);
    }

    #[tokio::test]
    async fn test_oversized_request_is_not_a_deadlock() {
        let limiter = RateLimiter::new(1, 3600);
        limiter.acquire(5).await;
        assert_eq!(limiter.stats().await.points_used, 5);
    }
}
