//! # Fibonacci Backoff
//!
//! Retry delays for failed reconcile passes, tracked per resource.
//!
//! The sequence is computed in minutes and capped: with the defaults of one
//! and ten minutes it runs 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...
//!
//! ```rust
//! use gke_cluster_controller::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 120);
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Current delay in seconds; advances the sequence.
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let seconds = self.current_minutes * 60;
        let next = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next.min(self.max_minutes);
        seconds
    }

    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

/// Backoff and error count of one resource.
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

/// Per-resource backoff keyed by `kind/namespace/name`.
///
/// The only mutable state shared between reconcile tasks.
#[derive(Debug)]
pub struct BackoffRegistry {
    min_minutes: u64,
    max_minutes: u64,
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffRegistry {
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            max_minutes,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure and return the delay before the next attempt
    /// together with the consecutive error count.
    pub fn record_failure(&self, key: &str) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_insert_with(|| BackoffState {
                    backoff: FibonacciBackoff::new(self.min_minutes, self.max_minutes),
                    error_count: 0,
                });
                state.error_count += 1;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (Duration::from_secs(self.min_minutes * 60), 0)
            }
        }
    }

    /// Forget the failures of a resource. Returns true if it was backing off.
    pub fn reset(&self, key: &str) -> bool {
        self.states
            .lock()
            .ok()
            .and_then(|mut states| states.remove(key))
            .is_some_and(|state| state.error_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence_is_capped() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        let sequence: Vec<u64> = (0..9).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(sequence, vec![60, 60, 120, 180, 300, 480, 600, 600, 600]);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();

        backoff.reset();
        assert_eq!(backoff.next_backoff(), Duration::from_secs(60));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(60));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(120));
    }

    #[test]
    fn test_registry_tracks_resources_independently() {
        let registry = BackoffRegistry::new(1, 10);

        assert_eq!(registry.record_failure("cp/ns/a"), (Duration::from_secs(60), 1));
        assert_eq!(registry.record_failure("cp/ns/a"), (Duration::from_secs(60), 2));
        assert_eq!(registry.record_failure("cp/ns/a"), (Duration::from_secs(120), 3));
        assert_eq!(registry.record_failure("cp/ns/b"), (Duration::from_secs(60), 1));

        assert!(registry.reset("cp/ns/a"));
        assert!(!registry.reset("cp/ns/a"));
        assert_eq!(registry.record_failure("cp/ns/a"), (Duration::from_secs(60), 1));
        assert_eq!(registry.record_failure("cp/ns/b"), (Duration::from_secs(60), 2));
    }
}
