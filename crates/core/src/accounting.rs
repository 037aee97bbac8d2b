//! Uptime/downtime wall-clock accounting.
//!
//! Every sample credits the interval since the *previous* check to whichever
//! bucket matches the previous sample's classification: if the entity was
//! last seen online, the time that passed was uptime, regardless of what the
//! new sample says. The first sample for an entity credits nothing.

use crate::status::RawStatus;
use crate::types::Timestamp;

/// Which accounting bucket an elapsed interval belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    Uptime(i64),
    Downtime(i64),
    /// First sample, or a sample whose timestamp is not after the previous
    /// check (clock skew, duplicate delivery). Nothing is credited.
    None,
}

/// Compute the credit for a new sample.
///
/// `previous_status` and `previous_checked_at` come from the entity's state
/// row as it was before this sample; `checked_at` is the new sample's
/// timestamp.
pub fn credit_interval(
    previous_status: Option<RawStatus>,
    previous_checked_at: Option<Timestamp>,
    checked_at: Timestamp,
) -> Credit {
    let (Some(prev_status), Some(prev_at)) = (previous_status, previous_checked_at) else {
        return Credit::None;
    };

    let elapsed = (checked_at - prev_at).num_seconds();
    if elapsed <= 0 {
        return Credit::None;
    }

    if prev_status.is_success() {
        Credit::Uptime(elapsed)
    } else {
        Credit::Downtime(elapsed)
    }
}
