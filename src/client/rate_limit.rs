//! Request pacing for outbound API calls
//!
//! Enforces a minimum inter-request interval, an optional requests-per-minute
//! cap over a sliding window, and random jitter so traffic does not look
//! machine-synchronized.

use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};

/// Width of the sliding window used by the requests-per-minute cap.
const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter tuning knobs.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum gap between consecutive requests
    pub min_interval: Duration,
    /// Sliding-window cap; `None` disables the window entirely
    pub requests_per_minute: Option<u32>,
    /// Upper bound for the uniform random jitter added to every wait
    pub jitter_max: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(800),
            requests_per_minute: Some(50),
            jitter_max: Duration::from_millis(200),
        }
    }
}

/// Blocking-style pacer for a single logical task.
///
/// `wait` takes `&mut self`; the pipeline is strictly sequential so no
/// internal locking is needed.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    last_call: Option<Instant>,
    window: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_call: None,
            window: VecDeque::new(),
        }
    }

    /// A limiter that never sleeps. Intended for tests.
    pub fn unthrottled() -> Self {
        Self::new(RateLimitConfig {
            min_interval: Duration::ZERO,
            requests_per_minute: None,
            jitter_max: Duration::ZERO,
        })
    }

    /// Block until it is safe to issue the next request, then record the call.
    ///
    /// Order of enforcement: sliding-window cap, minimum interval, jitter.
    pub async fn wait(&mut self) {
        let mut now = Instant::now();

        if let Some(cap) = self.config.requests_per_minute {
            while let Some(&oldest) = self.window.front() {
                if now.duration_since(oldest) >= WINDOW {
                    self.window.pop_front();
                } else {
                    break;
                }
            }
            if self.window.len() >= cap as usize {
                if let Some(&oldest) = self.window.front() {
                    sleep_until(oldest + WINDOW).await;
                    now = Instant::now();
                }
            }
        }

        if let Some(last) = self.last_call {
            let gap = now.duration_since(last);
            if gap < self.config.min_interval {
                sleep(self.config.min_interval - gap).await;
            }
        }

        if !self.config.jitter_max.is_zero() {
            let fraction: f64 = rand::thread_rng().gen_range(0.0..=1.0);
            sleep(self.config.jitter_max.mul_f64(fraction)).await;
        }

        let ts = Instant::now();
        self.last_call = Some(ts);
        if self.config.requests_per_minute.is_some() {
            self.window.push_back(ts);
        }
    }
}
