// 8.0.2: result types and errors for market operations. every error leaves the market,
// the positions and the ledger exactly as they were before the call.

use crate::math::MathError;
use crate::types::{Address, Timestamp};
use crate::vamm::VammError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeResult {
    pub trader: Address,
    pub size_delta: i128,
    pub old_size: i128,
    pub new_size: i128,
    pub average_price: u128,
    pub quote_delta: u128,
    pub fee: u128,
    /// Margin held by the position after the trade (0 once settled)
    pub margin: u128,
    pub entry_price: u128,
    pub mark_price: u128,
    /// Set when an opposite trade netted the position to exactly zero
    pub settlement: Option<CloseResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseResult {
    pub trader: Address,
    pub size: i128,
    pub exit_price: u128,
    pub price_pnl: i128,
    pub funding_pnl: i128,
    pub net_pnl: i128,
    pub fee: u128,
    /// margin + net pnl - fee, may be negative
    pub final_collateral: i128,
    pub payout: u128,
    pub bad_debt: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub trader: Address,
    pub liquidator: Address,
    pub size: i128,
    pub exit_price: u128,
    pub net_pnl: i128,
    pub fee: u128,
    pub final_collateral: i128,
    pub reward: u128,
    pub to_liquidator: u128,
    pub to_trader: u128,
    pub bad_debt: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingResult {
    pub elapsed_secs: u64,
    pub mark_twap: u128,
    pub index_twap: u128,
    pub premium: i128,
    pub funding_rate: i128,
    pub cumulative_funding_rate: i128,
    pub next_funding_time: Timestamp,
}

// valuation of one position at the current mark price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHealth {
    pub mark_price: u128,
    pub notional: u128,
    pub unrealized_pnl: i128,
    /// margin + unrealized pnl
    pub equity: i128,
    pub maintenance_requirement: u128,
    pub liquidatable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("margin delta must be non-zero")]
    InvalidMargin,

    #[error("size delta must be non-zero")]
    InvalidSize,

    #[error("no open position for {0}")]
    NoPosition(Address),

    #[error("notional {notional} over margin {margin} exceeds max leverage")]
    ExceedsMaxLeverage { notional: u128, margin: u128 },

    #[error("position is not liquidatable")]
    PositionNotLiquidatable,

    #[error("funding not due until {next}")]
    FundingTooEarly { next: Timestamp },

    #[error("collateral transfer failed")]
    TransferFailed,

    #[error("invalid {0} address")]
    InvalidAddress(&'static str),

    #[error("invalid reserves: base {base}, quote {quote}")]
    InvalidReserves { base: u128, quote: u128 },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("reentrant call rejected")]
    Reentrancy,

    #[error("vamm error: {0}")]
    Vamm(#[from] VammError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}
