//! Detection-rate limiter.
//!
//! The pose model is far more expensive than a render frame, so detection
//! is capped at ~20 Hz while the host loop runs at its native rate. The
//! limiter never suspends anything; it just answers "run detection this
//! tick?".

use std::time::{Duration, Instant};

pub struct FrameLimiter {
    interval: Duration,
    last_run: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(interval: Duration) -> Self {
        FrameLimiter {
            interval,
            last_run: None,
        }
    }

    /// True when at least `interval` has passed since the last admitted
    /// tick. The first call always runs.
    pub fn should_run(&mut self, now: Instant) -> bool {
        match self.last_run {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_run = Some(now);
                true
            }
        }
    }

    /// Forget the last run; the next tick is admitted unconditionally.
    pub fn reset(&mut self) {
        self.last_run = None;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_runs() {
        let mut lim = FrameLimiter::new(Duration::from_millis(50));
        assert!(lim.should_run(Instant::now()));
    }

    #[test]
    fn tick_inside_interval_refused() {
        let mut lim = FrameLimiter::new(Duration::from_millis(50));
        let t0 = Instant::now();
        assert!(lim.should_run(t0));
        assert!(!lim.should_run(t0 + Duration::from_millis(16)));
        assert!(!lim.should_run(t0 + Duration::from_millis(49)));
    }

    #[test]
    fn tick_after_interval_admitted() {
        let mut lim = FrameLimiter::new(Duration::from_millis(50));
        let t0 = Instant::now();
        assert!(lim.should_run(t0));
        assert!(lim.should_run(t0 + Duration::from_millis(50)));
        // The admitted tick restarts the window.
        assert!(!lim.should_run(t0 + Duration::from_millis(80)));
        assert!(lim.should_run(t0 + Duration::from_millis(101)));
    }

    #[test]
    fn reset_readmits_immediately() {
        let mut lim = FrameLimiter::new(Duration::from_millis(50));
        let t0 = Instant::now();
        assert!(lim.should_run(t0));
        lim.reset();
        assert!(lim.should_run(t0 + Duration::from_millis(1)));
    }
}
