// 8.0 engine/core.rs: the market struct. reserves, positions, the guard and the two
// external collaborators (volatility index, collateral ledger) all live here.

use super::config::EngineConfig;
use super::results::MarketError;
use crate::events::{Event, EventLog};
use crate::guard::ReentrancyGuard;
use crate::ledger::CollateralLedger;
use crate::market::{MarketConfig, MarketState};
use crate::math::{checked_add, to_native_ceil, to_native_floor, MathError, SCALE_DECIMALS};
use crate::position::Position;
use crate::types::{Address, Timestamp};
use crate::variance::VolatilityIndex;
use std::collections::HashMap;

/** 8.1: main market struct. all state lives here */
#[derive(Debug)]
pub struct PerpetualMarket<I, L> {
    pub(super) config: MarketConfig,
    pub(super) state: MarketState,
    pub(super) positions: HashMap<Address, Position>,
    pub(super) guard: ReentrancyGuard,
    pub(super) log: EventLog,
    pub(super) index: I,
    pub(super) ledger: L,
}

impl<I: VolatilityIndex, L: CollateralLedger> PerpetualMarket<I, L> {
    pub fn new(
        config: MarketConfig,
        engine: EngineConfig,
        index: I,
        ledger: L,
        now: Timestamp,
    ) -> Result<Self, MarketError> {
        config.validate()?;
        let decimals = ledger.decimals();
        if decimals > SCALE_DECIMALS {
            return Err(MathError::UnsupportedDecimals(decimals).into());
        }

        let state = MarketState::new(&config, now, index.cumulative_volatility(now)?);
        tracing::debug!(
            market = %config.market,
            base = config.base_reserve,
            quote = config.quote_reserve,
            "market created"
        );

        Ok(Self {
            config,
            state,
            positions: HashMap::new(),
            guard: ReentrancyGuard::new(),
            log: EventLog::new(engine),
            index,
            ledger,
        })
    }

    /// Rebuild a market from persisted state and positions.
    pub fn restore(
        config: MarketConfig,
        engine: EngineConfig,
        state: MarketState,
        positions: HashMap<Address, Position>,
        index: I,
        ledger: L,
    ) -> Result<Self, MarketError> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            positions: positions.into_iter().filter(|(_, p)| !p.is_empty()).collect(),
            guard: ReentrancyGuard::new(),
            log: EventLog::new(engine),
            index,
            ledger,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn state(&self) -> MarketState {
        self.state
    }

    pub fn position(&self, trader: Address) -> Option<&Position> {
        self.positions.get(&trader).filter(|p| !p.is_empty())
    }

    pub fn positions(&self) -> &HashMap<Address, Position> {
        &self.positions
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn total_bad_debt(&self) -> u128 {
        self.state.total_bad_debt
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    // the simulation and tests fund traders through this
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn events(&self) -> &[Event] {
        self.log.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.log.recent(count)
    }

    /// Checkpoint the mark TWAP without trading.
    pub fn mark_to_market(&mut self, now: Timestamp) -> Result<(), MarketError> {
        self.non_reentrant(|market| {
            let mut next = market.state;
            next.mark_to_market(now)?;
            market.state = next;
            Ok(())
        })
    }

    // 8.2: every mutating entry point runs inside this. the flag stays held across the
    // ledger calls, so a callback into the market fails instead of seeing staged state.
    pub(super) fn non_reentrant<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, MarketError>,
    ) -> Result<T, MarketError> {
        if self.guard.acquire().is_err() {
            tracing::warn!(market = %self.config.market, "reentrant call rejected");
            return Err(MarketError::Reentrancy);
        }
        let result = op(self);
        self.guard.release();
        result
    }

    // 8.3: ledger boundary. amounts arrive on SCALE and leave in native decimals.
    pub(super) fn pull_margin(&mut self, trader: Address, amount: u128) -> Result<(), MarketError> {
        let native = to_native_ceil(amount, self.ledger.decimals())?;
        if native == 0 {
            return Ok(());
        }
        if !self.ledger.transfer_from(trader, self.config.market, native) {
            tracing::warn!(trader = %trader, amount = native, "margin transfer failed");
            return Err(MarketError::TransferFailed);
        }
        Ok(())
    }

    // checks the market holds the total before the first leg moves
    pub(super) fn pay_out(&mut self, payouts: &[(Address, u128)]) -> Result<(), MarketError> {
        let decimals = self.ledger.decimals();
        let mut legs = Vec::with_capacity(payouts.len());
        let mut total = 0u128;
        for (to, amount) in payouts {
            let native = to_native_floor(*amount, decimals)?;
            if native > 0 {
                total = checked_add(total, native)?;
                legs.push((*to, native));
            }
        }
        if legs.is_empty() {
            return Ok(());
        }

        let market = self.config.market;
        let available = self.ledger.balance_of(market);
        if available < total {
            tracing::warn!(needed = total, available, "payout exceeds market balance");
            return Err(MarketError::TransferFailed);
        }

        let ok = match legs.as_slice() {
            [(to, amount)] => self.ledger.transfer(market, *to, *amount),
            _ => self.ledger.transfer_batch(market, &legs),
        };
        if !ok {
            tracing::warn!(legs = legs.len(), total, "payout transfer failed");
            return Err(MarketError::TransferFailed);
        }
        Ok(())
    }
}
