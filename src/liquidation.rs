//! Liquidation conditions and payout split.
//!
//! A position is liquidatable once its equity (margin + net pnl at the mark
//! price) is non-positive or below the maintenance requirement on its
//! notional. The liquidator's reward is a fixed fraction of notional; whatever
//! the position cannot cover is recorded as bad debt. There is no insurance
//! fund in this design.

use crate::math::{to_signed, wad_mul, MathError};
use serde::{Deserialize, Serialize};

/// maintenance requirement = maintenance_margin_ratio × notional.
pub fn maintenance_requirement(notional: u128, maintenance_margin_ratio: u128) -> Result<u128, MathError> {
    wad_mul(maintenance_margin_ratio, notional)
}

pub fn is_liquidatable(
    equity: i128,
    notional: u128,
    maintenance_margin_ratio: u128,
) -> Result<bool, MathError> {
    if equity <= 0 {
        return Ok(true);
    }
    let requirement = to_signed(maintenance_requirement(notional, maintenance_margin_ratio)?)?;
    Ok(equity < requirement)
}

pub fn liquidation_reward(notional: u128, liquidation_fee_rate: u128) -> Result<u128, MathError> {
    wad_mul(liquidation_fee_rate, notional)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPayout {
    pub to_liquidator: u128,
    pub to_trader: u128,
    pub bad_debt: u128,
}

/// Split what is left of a liquidated position.
///
/// Above the reward: liquidator gets the reward, trader the rest. At or below
/// it: liquidator takes whatever is left and the negative part, if any, is
/// unbacked bad debt.
pub fn split_payout(final_collateral: i128, reward: u128) -> LiquidationPayout {
    if final_collateral > 0 && final_collateral.unsigned_abs() > reward {
        return LiquidationPayout {
            to_liquidator: reward,
            to_trader: final_collateral.unsigned_abs() - reward,
            bad_debt: 0,
        };
    }

    if final_collateral >= 0 {
        LiquidationPayout {
            to_liquidator: final_collateral.unsigned_abs(),
            to_trader: 0,
            bad_debt: 0,
        }
    } else {
        LiquidationPayout {
            to_liquidator: 0,
            to_trader: 0,
            bad_debt: final_collateral.unsigned_abs(),
        }
    }
}
