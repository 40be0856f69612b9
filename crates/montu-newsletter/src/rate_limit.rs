//! Fixed-window request limiter keyed by client identifier.
//!
//! Each key owns one [`LimitEntry`]. The first request of a window creates
//! it, later requests inside the window bump its count until `limit` is
//! reached, and once `reset_at` has passed the next request starts a fresh
//! window. Windows are hard cutoffs, so a client can fit up to twice the
//! limit around a boundary.
//!
//! Expired entries are dropped by [`RateLimiter::sweep`], which
//! [`RateLimiter::spawn_sweeper`] runs on a timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// How often the background sweep runs by default.
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Shortest sweep period; tokio intervals cannot tick every zero seconds.
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the limiter.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: Instant) {
        *self.current.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}

/// How many requests a key may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests allowed per window
    pub limit: u32,
    /// Window length
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Newsletter subscribe: 3 requests per 15 minutes.
    pub const SUBSCRIBE: RateLimitPolicy = RateLimitPolicy {
        limit: 3,
        window: Duration::from_secs(15 * 60),
    };

    /// Create a policy.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: Instant,
}

impl RateLimitDecision {
    /// Time left until the window resets, measured from `now`.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }

    /// Whole minutes until the window resets, rounded up and never below one.
    pub fn retry_after_minutes(&self, now: Instant) -> u64 {
        let secs = self.retry_after(now).as_secs_f64();
        ((secs / 60.0).ceil() as u64).max(1)
    }
}

/// Per-key counter for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitEntry {
    /// Requests admitted in this window
    pub count: u32,
    /// End of the window
    pub reset_at: Instant,
}

impl LimitEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.reset_at < now
    }
}

/// In-memory fixed-window rate limiter.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    entries: Arc<Mutex<HashMap<String, LimitEntry>>>,
    clock: Arc<C>,
}

impl<C: Clock> Clone for RateLimiter<C> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl RateLimiter<SystemClock> {
    /// Create a limiter on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a limiter that reads time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(clock),
        }
    }

    /// Current time on the limiter's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Count a request from `identifier` against `policy`.
    pub fn check(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries
            .get_mut(identifier)
            .filter(|entry| !entry.is_expired(now))
        {
            if entry.count >= policy.limit {
                return RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_at: entry.reset_at,
                };
            }

            entry.count += 1;
            return RateLimitDecision {
                allowed: true,
                remaining: policy.limit - entry.count,
                reset_at: entry.reset_at,
            };
        }

        let reset_at = window_end(now, policy.window);
        entries.insert(identifier.to_string(), LimitEntry { count: 1, reset_at });

        RateLimitDecision {
            allowed: true,
            remaining: policy.limit.saturating_sub(1),
            reset_at,
        }
    }

    /// Drop every entry whose window has ended. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Entry currently stored for `identifier`, expired or not.
    pub fn entry(&self, identifier: &str) -> Option<LimitEntry> {
        self.entries.lock().get(identifier).copied()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Run [`sweep`](Self::sweep) every `period` on the tokio runtime.
    ///
    /// Must be called from within a runtime. Periods below
    /// [`MIN_SWEEP_PERIOD`] are raised to it. The task stops when the returned
    /// handle is shut down or dropped.
    pub fn spawn_sweeper(&self, period: Duration) -> SweeperHandle {
        let period = if period < MIN_SWEEP_PERIOD {
            tracing::warn!(
                "Sweep period {:?} is too short, using {:?}",
                period,
                MIN_SWEEP_PERIOD
            );
            MIN_SWEEP_PERIOD
        } else {
            period
        };

        let limiter = self.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            tracing::debug!("Swept {} expired rate limit entries", removed);
                        }
                    }
                    _ = &mut stop_rx => break,
                }
            }
        });

        SweeperHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// `now + window`, saturating at the latest representable instant.
fn window_end(now: Instant, window: Duration) -> Instant {
    let mut window = window;
    loop {
        match now.checked_add(window) {
            Some(end) => return end,
            None => window /= 2,
        }
    }
}

/// Handle to a background sweep task.
#[derive(Debug)]
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweep and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Rate limit sweeper ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
