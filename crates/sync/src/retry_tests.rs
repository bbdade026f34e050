// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use proptest::prelude::*;

use super::{RetryPolicy, RetryState};

fn delays(policy: &RetryPolicy, mut state: RetryState, n: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let (delay, next) = policy.next(state);
        out.push(delay.as_millis() as u64);
        state = next;
    }
    out
}

#[test]
fn default_sequence_doubles_then_caps() {
    let policy = RetryPolicy::default();
    assert_eq!(
        delays(&policy, RetryState::default(), 7),
        vec![1000, 2000, 4000, 8000, 8000, 8000, 8000]
    );
}

#[test]
fn reset_returns_to_floor() {
    let policy = RetryPolicy::default();
    let mut state = RetryState::default();
    for _ in 0..5 {
        state = policy.next(state).1;
    }
    state = policy.reset();
    let (delay, _) = policy.next(state);
    assert_eq!(delay, Duration::from_millis(1000));
}

#[test]
fn ceiling_below_floor_is_clamped() {
    let policy = RetryPolicy::new(Duration::from_millis(500), Duration::from_millis(100));
    assert_eq!(policy.ceiling, Duration::from_millis(500));
    assert_eq!(delays(&policy, RetryState::default(), 3), vec![500, 500, 500]);
}

#[test]
fn long_runs_do_not_overflow() {
    let policy = RetryPolicy::default();
    let mut state = RetryState::default();
    for _ in 0..200 {
        let (delay, next) = policy.next(state);
        assert!(delay <= policy.ceiling);
        state = next;
    }
}

proptest! {
    #[test]
    fn delays_are_monotonic_and_capped(floor in 1u64..5_000, extra in 0u64..60_000, n in 1usize..40) {
        let policy = RetryPolicy::new(Duration::from_millis(floor), Duration::from_millis(floor + extra));
        let seq = delays(&policy, RetryState::default(), n);
        prop_assert_eq!(seq[0], floor);
        for pair in seq.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        for d in &seq {
            prop_assert!(*d <= floor + extra);
        }
    }
}
