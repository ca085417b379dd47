//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff mechanism for reconciliation retries.
//! This grows more slowly than exponential backoff, which suits a controller
//! that may need several retries without hammering the API server.
//!
//! Sequence with the defaults used by the reconciler: 5s, 5s, 10s, 15s, 25s, 40s, 60s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Generates backoff durations following the Fibonacci sequence.
/// Each backoff is the sum of the previous two backoffs, capped at a maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_seconds: u64,
    /// Previous backoff value in seconds
    prev_seconds: u64,
    /// Current backoff value in seconds
    current_seconds: u64,
    /// Maximum backoff value in seconds
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values in seconds
    ///
    /// Default sequence for reconciliation errors: 5s, 5s, 10s, 15s, 25s, 40s, 60s (max)
    ///
    /// # Arguments
    ///
    /// * `min_seconds` - Minimum backoff duration in seconds (used for first two values, typically 5)
    /// * `max_seconds` - Maximum backoff duration in seconds (caps the sequence, typically 60)
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    ///
    /// Returns the current backoff value and advances to the next Fibonacci
    /// number. The sequence is capped at `max_seconds`.
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_seconds;

        // Calculate next Fibonacci number
        let next_seconds = self.prev_seconds + self.current_seconds;

        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next_seconds, self.max_seconds);

        result_seconds
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    #[must_use]
    #[allow(dead_code)] // Utility method, may be useful in the future
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}
