//! # Fibonacci Backoff
//!
//! Progressive retry delays for failed reconciliations.
//!
//! The delay grows along the Fibonacci sequence scaled by the minimum delay
//! (`min, min, 2*min, 3*min, 5*min, ...`) and is capped at the maximum.

/// Per-resource Fibonacci backoff, in seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciBackoff {
    min_secs: u64,
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_secs` and capped at `max_secs`
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
            previous: 0,
            current: 1,
        }
    }

    /// Next delay in seconds; advances the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let delay = self
            .current
            .saturating_mul(self.min_secs)
            .min(self.max_secs);
        // Stop advancing once capped so the counters cannot overflow
        if delay < self.max_secs {
            let next = self.previous.saturating_add(self.current);
            self.previous = self.current;
            self.current = next;
        }
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_follows_fibonacci() {
        let mut backoff = FibonacciBackoff::new(1, 100);
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(delays, vec![1, 1, 2, 3, 5, 8, 13, 21]);
    }

    #[test]
    fn test_sequence_is_scaled_by_minimum() {
        let mut backoff = FibonacciBackoff::new(5, 1000);
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(delays, vec![5, 5, 10, 15, 25]);
    }

    #[test]
    fn test_sequence_is_capped() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        let delays: Vec<u64> = (0..10).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(delays, vec![1, 1, 2, 3, 5, 8, 10, 10, 10, 10]);
    }

    #[test]
    fn test_max_below_min_is_raised() {
        let mut backoff = FibonacciBackoff::new(30, 10);
        assert_eq!(backoff.next_backoff_seconds(), 30);
        assert_eq!(backoff.next_backoff_seconds(), 30);
    }
}
