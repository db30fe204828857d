//! Per-client fixed-window request throttle.
//!
//! Each client key owns a counter and the instant its current window
//! started. The read-check-increment sequence for a key runs while holding
//! that key's DashMap shard lock, so concurrent requests from the same
//! client can never undercount. Distinct clients hash to independent
//! entries and never share budget.
//!
//! The window is fixed, not sliding: a client may get up to twice the limit
//! through in a short burst straddling a window boundary.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default window length: 1 minute.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default idle time after which a client's counter is evicted.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

/// Default interval between eviction sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Limiter settings, loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
    /// Counters whose window started longer ago than this are evicted.
    /// Never shorter than `window`.
    pub idle_ttl: Duration,
    /// How often the eviction sweep runs.
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            idle_ttl: DEFAULT_IDLE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl RateLimitConfig {
    /// Replace zero values with their defaults.
    ///
    /// A zero budget would reject every request and a zero window would
    /// never count past one, so neither is a usable setting.
    pub fn normalized(self) -> Self {
        let mut config = self;
        if config.max_requests == 0 {
            warn!(default = DEFAULT_MAX_REQUESTS, "rate limit max_requests is 0, using default");
            config.max_requests = DEFAULT_MAX_REQUESTS;
        }
        if config.window.is_zero() {
            warn!(default_secs = DEFAULT_WINDOW.as_secs(), "rate limit window is 0, using default");
            config.window = DEFAULT_WINDOW;
        }
        if config.sweep_interval.is_zero() {
            config.sweep_interval = DEFAULT_SWEEP_INTERVAL;
        }
        config
    }
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request admitted; `count` is its position in the current window.
    Allowed { count: u32 },
    /// Limit exceeded; `retry_after` is the time left in the current window.
    Limited { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

#[derive(Debug)]
struct RequestCounter {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter keyed by client identifier.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    counters: DashMap<String, RequestCounter>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: config.normalized(),
            counters: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `client` now.
    pub fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    /// Count a request from `client` at `now`.
    ///
    /// A new client starts a window with count 1. If more than `window` has
    /// elapsed since the window started, the counter resets to 1 and the
    /// window restarts at `now`. Otherwise the counter is incremented and the
    /// request is limited once it exceeds `max_requests`.
    pub fn check_at(&self, client: &str, now: Instant) -> Decision {
        // The entry guard holds the shard write lock until it is dropped at
        // the end of this function.
        let mut counter = self
            .counters
            .entry(client.to_string())
            .or_insert_with(|| RequestCounter {
                count: 0,
                window_start: now,
            });

        let elapsed = now.saturating_duration_since(counter.window_start);
        if elapsed > self.config.window {
            counter.count = 1;
            counter.window_start = now;
            return Decision::Allowed { count: 1 };
        }

        counter.count = counter.count.saturating_add(1);
        if counter.count > self.config.max_requests {
            Decision::Limited {
                retry_after: self.config.window.saturating_sub(elapsed),
            }
        } else {
            Decision::Allowed {
                count: counter.count,
            }
        }
    }

    /// Number of tracked clients.
    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }

    /// Evict counters idle since before `now - idle_ttl`. Returns how many were dropped.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let ttl = self.config.idle_ttl.max(self.config.window);
        let before = self.counters.len();
        self.counters
            .retain(|_, c| now.saturating_duration_since(c.window_start) <= ttl);
        before.saturating_sub(self.counters.len())
    }

    /// Evict idle counters now.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    /// Spawn a periodic eviction task.
    pub fn spawn_eviction_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.config.sweep_interval);
            loop {
                interval.tick().await;
                let evicted = limiter.evict_idle();
                if evicted > 0 {
                    debug!(
                        evicted,
                        remaining = limiter.tracked_clients(),
                        "evicted idle rate-limit counters"
                    );
                }
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
