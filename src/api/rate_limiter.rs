//! Sliding-window rate limiter shared by every outbound request.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Exchange-wide ceiling per API key.
pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

/// Admits at most `max_requests` callers in any rolling `window`.
///
/// Waiters hold the lock while they sleep. The tokio mutex hands the lock
/// out in request order, so admissions are FIFO.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            admissions: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Suspend until a request may be sent, then record the admission.
    pub async fn wait_for_slot(&self) {
        let mut admissions = self.admissions.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = admissions.front() {
                if now.duration_since(oldest) >= self.window {
                    admissions.pop_front();
                } else {
                    break;
                }
            }

            if admissions.len() < self.max_requests {
                admissions.push_back(now);
                return;
            }

            let wait = admissions
                .front()
                .map(|&oldest| self.window.saturating_sub(now.duration_since(oldest)))
                .unwrap_or_default();
            debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting for slot");
            sleep(wait).await;
        }
    }

    /// Number of admissions inside the current window.
    #[cfg(test)]
    pub async fn in_flight(&self) -> usize {
        let admissions = self.admissions.lock().await;
        let now = Instant::now();
        admissions
            .iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}
