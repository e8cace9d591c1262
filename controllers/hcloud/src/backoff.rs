//! # Fibonacci Backoff
//!
//! Requeue delays for failed reconciliations. Delays grow along the
//! Fibonacci sequence, more slowly than exponential backoff, so a resource
//! that keeps failing on a transient cloud error is retried often at first
//! and settles at the cap.
//!
//! Default sequence: 15s, 15s, 30s, 45s, 75s, 120s, 195s, 300s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(300))
    }
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

    /// Return the current delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }

    /// Reset to the initial state after a success
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut FibonacciBackoff) -> u64 {
        backoff.next_backoff().as_secs()
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::default();
        let seq: Vec<u64> = (0..8).map(|_| secs(&mut backoff)).collect();
        assert_eq!(seq, vec![15, 15, 30, 45, 75, 120, 195, 300]);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(4));
        let seq: Vec<u64> = (0..7).map(|_| secs(&mut backoff)).collect();
        assert_eq!(seq, vec![1, 1, 2, 3, 4, 4, 4]);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::default();
        for _ in 0..4 {
            backoff.next_backoff();
        }
        backoff.reset();
        assert_eq!(secs(&mut backoff), 15);
        assert_eq!(secs(&mut backoff), 15);
        assert_eq!(secs(&mut backoff), 30);
    }
}
