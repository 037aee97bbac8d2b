//! Debounced Up/Down state machine for a single monitored entity.
//!
//! Raw probe results are noisy: a single lost packet must not flip an entity
//! to Down, and a single lucky reply must not flip an outage to Up. The
//! machine requires a configurable run of consecutive failures before
//! declaring Down, and a run of consecutive successes before recovering.

use crate::status::{RawStatus, StableState};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Debounce configuration
// ---------------------------------------------------------------------------

/// Consecutive-sample thresholds for state transitions.
#[derive(Debug, Clone, Copy)]
pub struct Debounce {
    /// Consecutive failure-class samples required to transition Up -> Down.
    pub fail_threshold: u32,
    /// Consecutive success-class samples required to transition Down -> Up.
    pub recover_threshold: u32,
}

impl Default for Debounce {
    fn default() -> Self {
        Self {
            fail_threshold: 3,
            recover_threshold: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracked state
// ---------------------------------------------------------------------------

/// The mutable per-entity tracking state the machine operates on.
///
/// Invariant: `down_since` is `Some` iff `stable_state == Down`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedState {
    pub stable_state: StableState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub down_since: Option<Timestamp>,
    pub last_state_change_at: Option<Timestamp>,
}

impl TrackedState {
    /// The initial state for an entity that has never been sampled: Up with
    /// zeroed counters.
    pub fn initial() -> Self {
        Self {
            stable_state: StableState::Up,
            consecutive_failures: 0,
            consecutive_successes: 0,
            down_since: None,
            last_state_change_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition outcome
// ---------------------------------------------------------------------------

/// The result of feeding one sample through the machine.
///
/// At most one of the two signals is set, and only on the exact sample that
/// crosses a threshold -- repeating identical samples after a transition does
/// not re-raise the signal, so callers react exactly once per genuine
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The stable state after this sample.
    pub state: StableState,
    /// Set on the sample that completes the Up -> Down transition.
    pub should_create_incident: bool,
    /// Set on the sample that completes the Down -> Up transition.
    pub should_resolve_incident: bool,
}

// ---------------------------------------------------------------------------
// The machine
// ---------------------------------------------------------------------------

/// Feed one raw sample through the hysteresis machine, mutating `state`.
///
/// `now` is the sample's effective timestamp; it becomes `down_since` and
/// `last_state_change_at` when a transition fires.
pub fn apply_sample(
    state: &mut TrackedState,
    status: RawStatus,
    now: Timestamp,
    debounce: &Debounce,
) -> Transition {
    if status.is_success() {
        state.consecutive_successes += 1;
        state.consecutive_failures = 0;

        if state.stable_state == StableState::Down
            && state.consecutive_successes >= debounce.recover_threshold
        {
            state.stable_state = StableState::Up;
            state.down_since = None;
            state.last_state_change_at = Some(now);
            return Transition {
                state: StableState::Up,
                should_create_incident: false,
                should_resolve_incident: true,
            };
        }
    } else {
        state.consecutive_failures += 1;
        state.consecutive_successes = 0;

        if state.stable_state == StableState::Up
            && state.consecutive_failures >= debounce.fail_threshold
        {
            state.stable_state = StableState::Down;
            state.down_since = Some(now);
            state.last_state_change_at = Some(now);
            return Transition {
                state: StableState::Down,
                should_create_incident: true,
                should_resolve_incident: false,
            };
        }
    }

    Transition {
        state: state.stable_state,
        should_create_incident: false,
        should_resolve_incident: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
