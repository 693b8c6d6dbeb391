//! Poll interval with exponential backoff on consecutive fetch failures.
//!
//! The delay starts at the base interval, doubles for each consecutive
//! failure after the first, saturates at the ceiling, and snaps back to the
//! base on the first success.

use std::time::Duration;

/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(20);

/// Default backoff ceiling.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(160);

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Backoff {
            base,
            max: max.max(base),
            failures: 0,
        }
    }

    /// Delay before the next cycle given the outcomes so far.
    pub fn delay(&self) -> Duration {
        if self.failures <= 1 {
            return self.base;
        }
        let factor = 1u32.checked_shl(self.failures - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Record a failed cycle. Returns the delay to wait next.
    pub fn on_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.delay()
    }

    /// Record a successful cycle. Returns the (reset) delay to wait next.
    pub fn on_success(&mut self) -> Duration {
        self.failures = 0;
        self.delay()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(DEFAULT_INTERVAL, DEFAULT_MAX_BACKOFF)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(d: Duration) -> u64 {
        d.as_secs()
    }

    #[test]
    fn test_initial_delay() {
        assert_eq!(secs(Backoff::default().delay()), 20);
    }

    #[test]
    fn test_three_failures_then_success() {
        let mut b = Backoff::default();
        assert_eq!(secs(b.on_failure()), 20);
        assert_eq!(secs(b.on_failure()), 40);
        assert_eq!(secs(b.on_failure()), 80);
        assert_eq!(b.consecutive_failures(), 3);
        assert_eq!(secs(b.on_success()), 20);
        assert_eq!(b.consecutive_failures(), 0);
    }

    #[test]
    fn test_ceiling() {
        let mut b = Backoff::default();
        let delays: Vec<u64> = (0..8).map(|_| secs(b.on_failure())).collect();
        assert_eq!(delays, vec![20, 40, 80, 160, 160, 160, 160, 160]);
    }

    #[test]
    fn test_no_overflow_after_many_failures() {
        let mut b = Backoff::default();
        for _ in 0..1000 {
            b.on_failure();
        }
        assert_eq!(secs(b.delay()), 160);
    }

    #[test]
    fn test_ceiling_below_base_clamps_to_base() {
        let b = Backoff::new(Duration::from_secs(30), Duration::from_secs(10));
        let mut b2 = b.clone();
        assert_eq!(secs(b2.on_failure()), 30);
        assert_eq!(secs(b2.on_failure()), 30);
    }
}
