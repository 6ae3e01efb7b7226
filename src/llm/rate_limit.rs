//! Process-wide outbound rate control.
//!
//! The generation service enforces an external rate contract, so the
//! limiter is one shared component injected into the client rather than
//! ambient state: a single last-call timestamp behind an async mutex. The
//! lock is held across the wait, so two concurrent queries can never both
//! observe a stale timestamp and slip through the minimum interval
//! together.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

pub struct RateLimiter {
    min_interval: Duration,
    startup_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, startup_delay: Duration) -> Self {
        Self {
            min_interval,
            startup_delay,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the next outbound call is permitted, then stamp it.
    ///
    /// The very first call after process start waits the full startup
    /// delay; later calls wait out whatever remains of the minimum
    /// interval since the previous grant.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        match *last {
            None => sleep(self.startup_delay).await,
            Some(previous) => {
                let elapsed = previous.elapsed();
                if elapsed < self.min_interval {
                    sleep(self.min_interval - elapsed).await;
                }
            }
        }

        *last = Some(Instant::now());
    }

    /// Forget the last-call timestamp; the next call pays the startup
    /// delay again.
    pub async fn reset(&self) {
        *self.last_request.lock().await = None;
    }
}
