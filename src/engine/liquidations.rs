//! Liquidation detection and execution.

use super::core::PerpetualMarket;
use super::positions::realize;
use super::results::{LiquidationResult, MarketError, PositionHealth};
use crate::events::{EventPayload, LiquidationEvent};
use crate::ledger::CollateralLedger;
use crate::liquidation::{is_liquidatable, liquidation_reward, maintenance_requirement, split_payout};
use crate::market::MarketState;
use crate::math::{mul_div_signed, to_signed, SCALE_I};
use crate::position::Position;
use crate::types::{Address, CallContext};
use crate::variance::VolatilityIndex;

// value a position at the state's current mark price
pub(super) fn position_health(state: &MarketState, position: &Position) -> Result<PositionHealth, MarketError> {
    let mark_price = state.mark_price()?;
    let notional = position.notional(mark_price)?;
    let unrealized_pnl = position.net_pnl(mark_price, state.cumulative_funding_rate)?;
    let equity = position.equity(mark_price, state.cumulative_funding_rate)?;
    let maintenance_requirement = maintenance_requirement(notional, state.risk.maintenance_margin_ratio)?;

    Ok(PositionHealth {
        mark_price,
        notional,
        unrealized_pnl,
        equity,
        maintenance_requirement,
        liquidatable: is_liquidatable(equity, notional, state.risk.maintenance_margin_ratio)?,
    })
}

impl<I: VolatilityIndex, L: CollateralLedger> PerpetualMarket<I, L> {
    /// Liquidate `trader`'s position. Anyone may call; the caller is paid the reward.
    pub fn liquidate(&mut self, ctx: CallContext, trader: Address) -> Result<LiquidationResult, MarketError> {
        self.non_reentrant(|market| market.execute_liquidation(ctx, trader))
    }

    pub fn health(&self, trader: Address) -> Result<PositionHealth, MarketError> {
        let position = self.position(trader).ok_or(MarketError::NoPosition(trader))?;
        position_health(&self.state, position)
    }

    // no position reads as not liquidatable
    pub fn is_liquidatable(&self, trader: Address) -> Result<bool, MarketError> {
        match self.position(trader) {
            Some(position) => Ok(position_health(&self.state, position)?.liquidatable),
            None => Ok(false),
        }
    }

    pub fn unrealized_pnl(&self, trader: Address) -> Result<i128, MarketError> {
        Ok(self.health(trader)?.unrealized_pnl)
    }

    pub fn notional(&self, trader: Address) -> Result<u128, MarketError> {
        Ok(self.health(trader)?.notional)
    }

    /// equity / notional on SCALE
    pub fn margin_ratio(&self, trader: Address) -> Result<i128, MarketError> {
        let health = self.health(trader)?;
        Ok(mul_div_signed(health.equity, SCALE_I, to_signed(health.notional)?)?)
    }

    fn execute_liquidation(&mut self, ctx: CallContext, trader: Address) -> Result<LiquidationResult, MarketError> {
        let liquidator = ctx.caller;
        let position = *self.position(trader).ok_or(MarketError::NoPosition(trader))?;

        let mut next = self.state;
        next.mark_to_market(ctx.now)?;

        let health = position_health(&next, &position)?;
        if !health.liquidatable {
            return Err(MarketError::PositionNotLiquidatable);
        }
        let reward = liquidation_reward(health.notional, next.risk.liquidation_fee_rate)?;

        let unwind = next.quote(-position.size)?;
        next.apply_trade(&unwind);

        let settlement = realize(
            trader,
            &position,
            position.margin,
            &unwind,
            next.cumulative_funding_rate,
        )?;
        let payout = split_payout(settlement.final_collateral, reward);

        self.pay_out(&[(liquidator, payout.to_liquidator), (trader, payout.to_trader)])?;

        self.state = next;
        self.positions.remove(&trader);

        self.log.emit(
            ctx.now,
            EventPayload::Liquidation(LiquidationEvent {
                trader,
                liquidator,
                size: position.size,
                exit_price: unwind.average_price,
                final_collateral: settlement.final_collateral,
                reward: payout.to_liquidator,
                to_trader: payout.to_trader,
            }),
        );
        tracing::info!(
            trader = %trader,
            liquidator = %liquidator,
            size = position.size,
            final_collateral = settlement.final_collateral,
            reward = payout.to_liquidator,
            "position liquidated"
        );
        if payout.bad_debt > 0 {
            self.record_bad_debt(ctx.now, trader, payout.bad_debt);
        }

        Ok(LiquidationResult {
            trader,
            liquidator,
            size: position.size,
            exit_price: unwind.average_price,
            net_pnl: settlement.net_pnl,
            fee: unwind.fee,
            final_collateral: settlement.final_collateral,
            reward,
            to_liquidator: payout.to_liquidator,
            to_trader: payout.to_trader,
            bad_debt: payout.bad_debt,
        })
    }
}
