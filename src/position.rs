// 5.0: per-trader position. size is signed (long > 0), zero means absent.
// pnl = price pnl - funding pnl, both on SCALE. 5.2 has the merge rules for modifications.

use crate::math::{checked_add, mul_add_div, mul_div_signed, to_signed, MathError, SCALE_I};
use crate::types::Side;
use crate::vamm::notional;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub size: i128,
    pub margin: u128,
    pub entry_price: u128,
    // cumulative funding rate at the last modification
    pub funding_index_at_entry: i128,
}

impl Position {
    pub fn new(size: i128, margin: u128, entry_price: u128, funding_index: i128) -> Self {
        Self {
            size,
            margin,
            entry_price,
            funding_index_at_entry: funding_index,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn side(&self) -> Option<Side> {
        Side::of(self.size)
    }

    pub fn price_pnl(&self, exit_price: u128) -> Result<i128, MathError> {
        price_pnl(self.size, self.entry_price, exit_price)
    }

    pub fn funding_pnl(&self, cumulative_funding: i128) -> Result<i128, MathError> {
        funding_pnl(self.size, cumulative_funding, self.funding_index_at_entry)
    }

    // 5.1: what the trader would realize at `price` right now.
    pub fn net_pnl(&self, price: u128, cumulative_funding: i128) -> Result<i128, MathError> {
        let price_leg = self.price_pnl(price)?;
        let funding_leg = self.funding_pnl(cumulative_funding)?;
        price_leg.checked_sub(funding_leg).ok_or(MathError::Overflow)
    }

    // margin + net pnl. may be negative.
    pub fn equity(&self, price: u128, cumulative_funding: i128) -> Result<i128, MathError> {
        to_signed(self.margin)?
            .checked_add(self.net_pnl(price, cumulative_funding)?)
            .ok_or(MathError::Overflow)
    }

    pub fn notional(&self, price: u128) -> Result<u128, MathError> {
        notional(self.size, price)
    }
}

pub fn price_pnl(size: i128, entry_price: u128, exit_price: u128) -> Result<i128, MathError> {
    let price_move = to_signed(exit_price)? - to_signed(entry_price)?;
    mul_div_signed(price_move, size, SCALE_I)
}

// positive = the position owes funding.
pub fn funding_pnl(size: i128, cumulative_funding: i128, index_at_entry: i128) -> Result<i128, MathError> {
    let delta = cumulative_funding
        .checked_sub(index_at_entry)
        .ok_or(MathError::Overflow)?;
    mul_div_signed(delta, size, SCALE_I)
}

// what a modification did to the position. `Closed` only happens when the
// opposite leg nets the size to exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChange {
    Opened(Position),
    Increased(Position),
    Reduced(Position),
    Flipped(Position),
    Closed { previous: Position, margin: u128 },
}

impl PositionChange {
    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionChange::Opened(p)
            | PositionChange::Increased(p)
            | PositionChange::Reduced(p)
            | PositionChange::Flipped(p) => Some(p),
            PositionChange::Closed { .. } => None,
        }
    }
}

// 5.2: fold a fill into the existing position.
//  - none: take the fill as is.
//  - same direction: entry becomes the size weighted average of both legs.
//  - opposite direction: net the size, keep the entry price, add the margin. no pnl is
//    realized on the reduced portion.
// the funding snapshot always moves to the current index.
pub fn apply_fill(
    existing: Option<&Position>,
    size_delta: i128,
    fill_price: u128,
    margin_added: u128,
    funding_index: i128,
) -> Result<PositionChange, MathError> {
    let Some(old) = existing.filter(|p| !p.is_empty()) else {
        return Ok(PositionChange::Opened(Position::new(
            size_delta,
            margin_added,
            fill_price,
            funding_index,
        )));
    };

    let margin = checked_add(old.margin, margin_added)?;
    let new_size = old.size.checked_add(size_delta).ok_or(MathError::Overflow)?;

    if Side::of(old.size) == Side::of(size_delta) {
        let old_abs = old.size.unsigned_abs();
        let add_abs = size_delta.unsigned_abs();
        let entry_price = mul_add_div(
            old_abs,
            old.entry_price,
            add_abs,
            fill_price,
            checked_add(old_abs, add_abs)?,
        )?;
        return Ok(PositionChange::Increased(Position::new(
            new_size,
            margin,
            entry_price,
            funding_index,
        )));
    }

    if new_size == 0 {
        return Ok(PositionChange::Closed {
            previous: *old,
            margin,
        });
    }

    let netted = Position::new(new_size, margin, old.entry_price, funding_index);
    if Side::of(new_size) == Side::of(old.size) {
        Ok(PositionChange::Reduced(netted))
    } else {
        Ok(PositionChange::Flipped(netted))
    }
}
