//! Constant-product virtual AMM (x·y = k).
//!
//! Reserves are bookkeeping only. A long removes base from the pool and pays
//! quote in; a short adds base and takes quote out. The trading fee is charged
//! on the quote leg and injected back into the quote reserve, so `k` only ever
//! grows through fees.

use crate::math::{mul_div, wad_mul, MathError, SCALE};
use crate::types::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VammError {
    #[error("trade of {size} exhausts base reserve {base_reserve}")]
    InsufficientLiquidity { size: u128, base_reserve: u128 },

    #[error("trade size must be non-zero")]
    ZeroSize,

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Outcome of a trade against the reserves. Nothing is mutated until the caller
/// commits `new_base_reserve` / `new_quote_reserve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeQuote {
    pub side: Side,
    pub size: u128,
    pub quote_delta: u128,
    pub average_price: u128,
    pub fee: u128,
    pub new_base_reserve: u128,
    pub new_quote_reserve: u128,
}

/// Price a signed base trade. Positive `size_delta` buys base (long).
pub fn quote_trade(
    base_reserve: u128,
    quote_reserve: u128,
    size_delta: i128,
    fee_rate: u128,
) -> Result<TradeQuote, VammError> {
    let side = Side::of(size_delta).ok_or(VammError::ZeroSize)?;
    let size = size_delta.unsigned_abs();

    let new_base_reserve = match side {
        Side::Long => {
            if size >= base_reserve {
                return Err(VammError::InsufficientLiquidity { size, base_reserve });
            }
            base_reserve - size
        }
        Side::Short => base_reserve.checked_add(size).ok_or(MathError::Overflow)?,
    };

    let quote_delta = mul_div(quote_reserve, size, new_base_reserve)?;
    let average_price = mul_div(quote_delta, SCALE, size)?;
    let fee = wad_mul(fee_rate, quote_delta)?;

    let pre_fee_quote = match side {
        Side::Long => quote_reserve.checked_add(quote_delta).ok_or(MathError::Overflow)?,
        // quote * size / (base + size) < quote, cannot underflow
        Side::Short => quote_reserve - quote_delta,
    };
    let new_quote_reserve = pre_fee_quote.checked_add(fee).ok_or(MathError::Overflow)?;

    Ok(TradeQuote {
        side,
        size,
        quote_delta,
        average_price,
        fee,
        new_base_reserve,
        new_quote_reserve,
    })
}

/// vAMM-implied price of one unit of base, on SCALE.
pub fn mark_price(base_reserve: u128, quote_reserve: u128) -> Result<u128, MathError> {
    mul_div(quote_reserve, SCALE, base_reserve)
}

/// |size| × price.
pub fn notional(size: i128, price: u128) -> Result<u128, MathError> {
    wad_mul(size.unsigned_abs(), price)
}
