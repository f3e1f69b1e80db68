/*!
 * Requests-per-minute limiting.
 *
 * Hosted providers reject bursts above their quota with a 429. The limiter
 * keeps a sliding window of recent request start times and delays a request
 * until the window has room, so the retry budget is not spent on rejections.
 */

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter shared by all requests of a service
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    // Held across the wait so waiters are admitted in arrival order
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limit to `requests_per_minute` requests in any 60 second window
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::new(requests_per_minute as usize, MINUTE)
    }

    /// Limit to `max_requests` requests in any `window`
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            starts: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Wait until a request may start, then record it
    pub async fn acquire(&self) {
        let mut starts = self.starts.lock().await;
        let now = Instant::now();
        while starts.front().is_some_and(|start| now.duration_since(*start) >= self.window) {
            starts.pop_front();
        }

        if starts.len() >= self.max_requests {
            if let Some(oldest) = starts.pop_front() {
                let ready_at = oldest + self.window;
                debug!("Rate limit reached, waiting {:?}", ready_at.saturating_duration_since(now));
                tokio::time::sleep_until(ready_at).await;
            }
        }
        starts.push_back(Instant::now());
    }

    /// Requests recorded in the current window
    pub async fn in_window(&self) -> usize {
        let starts = self.starts.lock().await;
        let now = Instant::now();
        starts.iter().filter(|start| now.duration_since(**start) < self.window).count()
    }
}
