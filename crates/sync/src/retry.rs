// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect backoff: doubling delay between a floor and a ceiling.

use std::time::Duration;

/// Floor and ceiling for reconnect delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub floor: Duration,
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { floor: Duration::from_millis(1000), ceiling: Duration::from_millis(8000) }
    }
}

/// Last delay handed out. `None` means "never retried since the last reset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub last_delay: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        // A ceiling below the floor would make every delay the ceiling.
        Self { floor, ceiling: ceiling.max(floor) }
    }

    /// Compute the next reconnect delay and the state to carry forward.
    pub fn next(&self, state: RetryState) -> (Duration, RetryState) {
        let base = state.last_delay.unwrap_or(self.floor);
        let delay = base.min(self.ceiling);
        let doubled = base.checked_mul(2).unwrap_or(Duration::MAX);
        (delay, RetryState { last_delay: Some(doubled) })
    }

    /// State after a successful open: the next delay is the floor again.
    pub fn reset(&self) -> RetryState {
        RetryState { last_delay: Some(self.floor) }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
