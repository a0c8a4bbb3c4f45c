//! Market configuration and state.
//!
//! The market is a single vAMM on the volatility index. Configuration is
//! validated once at construction; the state holds the reserves, the funding
//! index, the mark-price accumulator and the risk parameters.

use crate::accumulator;
use crate::engine::MarketError;
use crate::math::{wad, SCALE};
use crate::types::{Address, Timestamp};
use crate::vamm::{self, TradeQuote};
use serde::{Deserialize, Serialize};

/// Risk parameters. All ratios are on SCALE, `funding_interval` is in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Maximum notional / margin, e.g. 10e18 for 10x
    pub max_leverage: u128,
    pub maintenance_margin_ratio: u128,
    /// Liquidator reward as a fraction of notional
    pub liquidation_fee_rate: u128,
    /// Charged on the quote leg of every trade, injected into the pool
    pub trading_fee_rate: u128,
    pub funding_interval: u64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            max_leverage: wad(10),
            maintenance_margin_ratio: 62_500_000_000_000_000, // 6.25%
            liquidation_fee_rate: 25_000_000_000_000_000,     // 2.5%
            trading_fee_rate: 1_000_000_000_000_000,          // 0.1%
            funding_interval: 3_600,
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.max_leverage < SCALE {
            return Err(MarketError::InvalidParameter {
                reason: "max leverage must be at least 1x".to_string(),
            });
        }
        if self.maintenance_margin_ratio == 0 || self.maintenance_margin_ratio >= SCALE {
            return Err(MarketError::InvalidParameter {
                reason: "maintenance margin ratio must be in (0, 1)".to_string(),
            });
        }
        if self.liquidation_fee_rate >= SCALE || self.trading_fee_rate >= SCALE {
            return Err(MarketError::InvalidParameter {
                reason: "fee rates must be below 1".to_string(),
            });
        }
        if self.funding_interval == 0 {
            return Err(MarketError::InvalidParameter {
                reason: "funding interval must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Static market configuration (immutable after construction)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// The market's own ledger identity; margin is pulled into it
    pub market: Address,
    /// Volatility index the market reads on funding
    pub oracle: Address,
    /// Collateral token ledger
    pub collateral: Address,
    pub base_reserve: u128,
    pub quote_reserve: u128,
    pub risk: RiskParams,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            market: Address(0x4d4b_5401),
            oracle: Address(0x5641_5201),
            collateral: Address(0x5553_4443),
            base_reserve: wad(1_000_000),
            quote_reserve: wad(200_000),
            risk: RiskParams::default(),
        }
    }
}

impl MarketConfig {
    pub fn validate(&self) -> Result<(), MarketError> {
        for (field, address) in [
            ("market", self.market),
            ("oracle", self.oracle),
            ("collateral", self.collateral),
        ] {
            if address.is_zero() {
                return Err(MarketError::InvalidAddress(field));
            }
        }
        if self.base_reserve == 0 || self.quote_reserve == 0 {
            return Err(MarketError::InvalidReserves {
                base: self.base_reserve,
                quote: self.quote_reserve,
            });
        }
        self.risk.validate()
    }
}

/// Dynamic market state (changes with every trade and settlement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub base_reserve: u128,
    pub quote_reserve: u128,
    pub cumulative_funding_rate: i128,
    pub last_funding_time: Timestamp,
    pub cumulative_mark_price: u128,
    pub last_mark_accumulator_update_time: Timestamp,
    /// Accumulator readings at the last settlement, the TWAP window starts here
    pub mark_cumulative_at_last_funding: u128,
    pub index_cumulative_at_last_funding: u128,
    /// Shortfalls absorbed so far. There is no insurance fund to offset them.
    pub total_bad_debt: u128,
    pub risk: RiskParams,
}

impl MarketState {
    pub fn new(config: &MarketConfig, now: Timestamp, index_cumulative: u128) -> Self {
        Self {
            base_reserve: config.base_reserve,
            quote_reserve: config.quote_reserve,
            cumulative_funding_rate: 0,
            last_funding_time: now,
            cumulative_mark_price: 0,
            last_mark_accumulator_update_time: now,
            mark_cumulative_at_last_funding: 0,
            index_cumulative_at_last_funding: index_cumulative,
            total_bad_debt: 0,
            risk: config.risk,
        }
    }

    pub fn mark_price(&self) -> Result<u128, MarketError> {
        Ok(vamm::mark_price(self.base_reserve, self.quote_reserve)?)
    }

    /// Fold the mark price that held since the last checkpoint into the
    /// accumulator. Must run before the reserves move.
    pub fn mark_to_market(&mut self, now: Timestamp) -> Result<(), MarketError> {
        let (cumulative, checkpoint) = accumulator::accrue(
            self.cumulative_mark_price,
            self.last_mark_accumulator_update_time,
            self.mark_price()?,
            now,
        )?;
        self.cumulative_mark_price = cumulative;
        self.last_mark_accumulator_update_time = checkpoint;
        Ok(())
    }

    /// The accumulator as it would read at `now`.
    pub fn projected_mark_cumulative(&self, now: Timestamp) -> Result<u128, MarketError> {
        Ok(accumulator::project(
            self.cumulative_mark_price,
            self.last_mark_accumulator_update_time,
            self.mark_price()?,
            now,
        )?)
    }

    /// Price a trade against the current reserves without applying it.
    pub fn quote(&self, size_delta: i128) -> Result<TradeQuote, MarketError> {
        Ok(vamm::quote_trade(
            self.base_reserve,
            self.quote_reserve,
            size_delta,
            self.risk.trading_fee_rate,
        )?)
    }

    pub fn apply_trade(&mut self, quote: &TradeQuote) {
        self.base_reserve = quote.new_base_reserve;
        self.quote_reserve = quote.new_quote_reserve;
    }

    pub fn next_funding_time(&self) -> Timestamp {
        self.last_funding_time.plus(self.risk.funding_interval)
    }

    pub fn is_funding_due(&self, now: Timestamp) -> bool {
        now >= self.next_funding_time()
    }

    /// x·y. only grows through fee injection.
    pub fn invariant(&self) -> ethnum::U256 {
        ethnum::U256::new(self.base_reserve) * ethnum::U256::new(self.quote_reserve)
    }
}
