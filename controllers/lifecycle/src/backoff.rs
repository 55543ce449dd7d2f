//! # Fibonacci Backoff
//!
//! Delay between sweeps after a failed sweep. Grows more slowly than
//! exponential backoff so a flapping API server is retried without being
//! hammered.
//!
//! With a one-minute base and a ten-minute cap the delays are
//! 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...

use std::time::Duration;

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min` and capped at `max`
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next.min(self.max);
        delay
    }

    /// Reset to the initial state after a successful sweep
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(n: u64) -> Duration {
        Duration::from_secs(n * 60)
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(minutes(1), minutes(10));

        assert_eq!(backoff.next_delay(), minutes(1));
        assert_eq!(backoff.next_delay(), minutes(1));
        assert_eq!(backoff.next_delay(), minutes(2));
        assert_eq!(backoff.next_delay(), minutes(3));
        assert_eq!(backoff.next_delay(), minutes(5));
        assert_eq!(backoff.next_delay(), minutes(8));
        assert_eq!(backoff.next_delay(), minutes(10));
        // 13m would follow, capped
        assert_eq!(backoff.next_delay(), minutes(10));
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(5), minutes(10));

        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));

        backoff.reset();

        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }
}
