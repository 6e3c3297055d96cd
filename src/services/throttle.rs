// src/services/throttle.rs
use log::warn;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

const PRUNE_THRESHOLD: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request limiter keyed by client IP.
/// Requests with no known address share one bucket.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<Option<IpAddr>, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        RateLimiter {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request for `client`; false once the window's quota is spent.
    pub fn check(&self, client: Option<IpAddr>) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            warn!("Rate limit exceeded for {:?}", client);
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Minimum spacing between successive events (e.g. forced cache refreshes).
pub struct Cooldown {
    period: Duration,
    last: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Cooldown {
            period,
            last: Mutex::new(None),
        }
    }

    /// Claims the slot if the previous claim is older than the period.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(previous) if now.duration_since(previous) < self.period => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test(start_paused = true)]
    async fn test_limit_resets_after_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let ip = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let other = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));

        assert!((0..3).all(|_| limiter.check(ip)));
        assert!(!limiter.check(ip));
        assert!(limiter.check(other));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.check(ip));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown() {
        let cooldown = Cooldown::new(Duration::from_secs(5));
        assert!(cooldown.try_acquire());
        assert!(!cooldown.try_acquire());

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!cooldown.try_acquire());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cooldown.try_acquire());
    }
}
