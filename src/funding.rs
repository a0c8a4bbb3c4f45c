// 6.0: funding. the mark TWAP is pulled toward the volatility index TWAP.
// positive rate = mark above index, longs pay shorts. a full day's premium is spread over
// 24 settlements so one settlement only closes 1/24 of the gap.

use crate::accumulator::twap;
use crate::math::{to_signed, MathError};
use serde::{Deserialize, Serialize};

pub const FUNDING_PERIODS_PER_DAY: i128 = 24;

// 6.1: both TWAPs over the settlement window and the resulting rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingWindow {
    pub elapsed_secs: u64,
    pub mark_twap: u128,
    pub index_twap: u128,
    pub premium: i128,
    pub funding_rate: i128,
}

pub fn premium(mark_twap: u128, index_twap: u128) -> Result<i128, MathError> {
    to_signed(mark_twap)?
        .checked_sub(to_signed(index_twap)?)
        .ok_or(MathError::Overflow)
}

// truncates toward zero like every other signed division here.
pub fn funding_rate(premium: i128) -> i128 {
    premium / FUNDING_PERIODS_PER_DAY
}

pub fn funding_window(
    mark_cumulative: u128,
    mark_snapshot: u128,
    index_cumulative: u128,
    index_snapshot: u128,
    elapsed_secs: u64,
) -> Result<FundingWindow, MathError> {
    let mark_twap = twap(mark_cumulative, mark_snapshot, elapsed_secs);
    let index_twap = twap(index_cumulative, index_snapshot, elapsed_secs);
    let premium = premium(mark_twap, index_twap)?;

    Ok(FundingWindow {
        elapsed_secs,
        mark_twap,
        index_twap,
        premium,
        funding_rate: funding_rate(premium),
    })
}
