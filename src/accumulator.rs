// 3.0: time-weighted accumulators. both engines integrate a value over time the same way:
// fold the value that held during [last_update, now) into the running sum BEFORE the value
// itself changes. a single extreme reading therefore never reweights the period it was absent.

use crate::math::MathError;
use crate::types::Timestamp;

// 3.1: the running sum as it would read at `now`, without persisting anything.
pub fn project(
    cumulative: u128,
    last_update: Timestamp,
    value: u128,
    now: Timestamp,
) -> Result<u128, MathError> {
    let elapsed = now.elapsed_since(last_update) as u128;
    let area = value.checked_mul(elapsed).ok_or(MathError::Overflow)?;
    cumulative.checked_add(area).ok_or(MathError::Overflow)
}

// 3.2: projected sum plus the new checkpoint. never moves the checkpoint backwards.
pub fn accrue(
    cumulative: u128,
    last_update: Timestamp,
    value: u128,
    now: Timestamp,
) -> Result<(u128, Timestamp), MathError> {
    let next = project(cumulative, last_update, value, now)?;
    Ok((next, last_update.max(now)))
}

// 3.3: average value over a window. zero-length windows read as zero.
pub fn twap(cumulative_now: u128, cumulative_then: u128, elapsed_secs: u64) -> u128 {
    if elapsed_secs == 0 {
        return 0;
    }
    cumulative_now.saturating_sub(cumulative_then) / elapsed_secs as u128
}
