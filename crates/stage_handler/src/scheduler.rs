use std::time::{Duration, Instant};

/// Gate that lets scene rebuild work run at most once per budget window.
///
/// `tick` itself is cheap; the expensive part of a frame is recomputing
/// layout and rebuilding the display list. Callers ask [`allow`] before
/// doing that work and record a deferral when the answer is no, so the
/// spillover shows up in telemetry instead of disappearing.
///
/// [`allow`]: FrameScheduler::allow
pub struct FrameScheduler {
    budget: Duration,
    last_window_start: Option<Instant>,
    /// Rebuilds that were requested but pushed to a later window.
    deferred_count: u64,
    /// Windows in which a rebuild actually ran.
    allowed_count: u64,
}

impl FrameScheduler {
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            last_window_start: None,
            deferred_count: 0,
            allowed_count: 0,
        }
    }

    /// The configured budget window.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Returns true if a new budget window has opened. The first call
    /// always opens one.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let open = match self.last_window_start {
            None => true,
            Some(start) => now.duration_since(start) >= self.budget,
        };
        if open {
            self.last_window_start = Some(now);
            self.allowed_count = self.allowed_count.saturating_add(1);
        }
        open
    }

    /// Record a rebuild that had to wait for the next window.
    pub fn incr_deferred(&mut self) {
        self.deferred_count = self.deferred_count.saturating_add(1);
    }

    /// Rebuilds deferred so far this session.
    #[must_use]
    pub fn deferred(&self) -> u64 {
        self.deferred_count
    }

    /// Windows in which a rebuild ran so far this session.
    #[must_use]
    pub fn allowed(&self) -> u64 {
        self.allowed_count
    }
}
