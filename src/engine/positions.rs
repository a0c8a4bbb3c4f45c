//! Position lifecycle: open, modify and close.
//!
//! Every operation stages its changes on a copy of the market state, does the
//! ledger call last, and only then commits. A failure anywhere, including the
//! ledger returning `false`, leaves the market exactly as it was.

use super::core::PerpetualMarket;
use super::results::{CloseResult, MarketError, TradeResult};
use crate::events::{
    BadDebtEvent, CloseReason, EventPayload, PositionClosedEvent, PositionModifiedEvent, PositionOpenedEvent,
};
use crate::ledger::CollateralLedger;
use crate::math::{to_signed, wad_div, MathError};
use crate::position::{apply_fill, Position, PositionChange};
use crate::types::{Address, CallContext, Timestamp};
use crate::vamm::TradeQuote;
use crate::variance::VolatilityIndex;

// pnl of a position fully unwound by `exit`
pub(super) fn realize(
    trader: Address,
    position: &Position,
    margin: u128,
    exit: &TradeQuote,
    cumulative_funding: i128,
) -> Result<CloseResult, MarketError> {
    let price_pnl = position.price_pnl(exit.average_price)?;
    let funding_pnl = position.funding_pnl(cumulative_funding)?;
    let net_pnl = price_pnl.checked_sub(funding_pnl).ok_or(MathError::Overflow)?;
    let final_collateral = to_signed(margin)?
        .checked_add(net_pnl)
        .and_then(|c| c.checked_sub(to_signed(exit.fee).ok()?))
        .ok_or(MathError::Overflow)?;

    Ok(CloseResult {
        trader,
        size: position.size,
        exit_price: exit.average_price,
        price_pnl,
        funding_pnl,
        net_pnl,
        fee: exit.fee,
        final_collateral,
        payout: final_collateral.max(0).unsigned_abs(),
        bad_debt: final_collateral.min(0).unsigned_abs(),
    })
}

impl<I: VolatilityIndex, L: CollateralLedger> PerpetualMarket<I, L> {
    /// Open a position or change an existing one by `size_delta`, adding
    /// `margin_delta` of collateral from the caller.
    pub fn open_or_modify(
        &mut self,
        ctx: CallContext,
        size_delta: i128,
        margin_delta: u128,
    ) -> Result<TradeResult, MarketError> {
        if margin_delta == 0 {
            return Err(MarketError::InvalidMargin);
        }
        if size_delta == 0 {
            return Err(MarketError::InvalidSize);
        }
        self.non_reentrant(|market| market.execute_trade(ctx, size_delta, margin_delta))
    }

    /// Unwind the caller's whole position and pay out what is left.
    pub fn close(&mut self, ctx: CallContext) -> Result<CloseResult, MarketError> {
        self.non_reentrant(|market| market.execute_close(ctx))
    }

    fn execute_trade(
        &mut self,
        ctx: CallContext,
        size_delta: i128,
        margin_delta: u128,
    ) -> Result<TradeResult, MarketError> {
        let trader = ctx.caller;
        let mut next = self.state;
        next.mark_to_market(ctx.now)?;

        let quote = next.quote(size_delta)?;
        next.apply_trade(&quote);
        let mark_price = next.mark_price()?;

        let existing = self.position(trader).copied();
        let old_size = existing.map_or(0, |p| p.size);
        let change = apply_fill(
            existing.as_ref(),
            size_delta,
            quote.average_price,
            margin_delta,
            next.cumulative_funding_rate,
        )?;

        let mut position = match change {
            PositionChange::Closed { previous, margin } => {
                let settlement = realize(trader, &previous, margin, &quote, next.cumulative_funding_rate)?;

                // one net transfer: the new margin in, the settlement out
                if settlement.payout >= margin_delta {
                    self.pay_out(&[(trader, settlement.payout - margin_delta)])?;
                } else {
                    self.pull_margin(trader, margin_delta - settlement.payout)?;
                }

                self.state = next;
                self.positions.remove(&trader);
                self.record_close(ctx.now, &settlement, CloseReason::Offset);

                return Ok(TradeResult {
                    trader,
                    size_delta,
                    old_size,
                    new_size: 0,
                    average_price: quote.average_price,
                    quote_delta: quote.quote_delta,
                    fee: quote.fee,
                    margin: 0,
                    entry_price: previous.entry_price,
                    mark_price,
                    settlement: Some(settlement),
                });
            }
            other => match other.position() {
                Some(p) => *p,
                None => return Err(MarketError::NoPosition(trader)),
            },
        };

        // the opening fee comes out of the position's margin
        if position.margin <= quote.fee {
            return Err(MarketError::InvalidMargin);
        }
        position.margin -= quote.fee;

        let notional = position.notional(mark_price)?;
        if wad_div(notional, position.margin)? > next.risk.max_leverage {
            tracing::debug!(trader = %trader, notional, margin = position.margin, "leverage check failed");
            return Err(MarketError::ExceedsMaxLeverage {
                notional,
                margin: position.margin,
            });
        }

        self.pull_margin(trader, margin_delta)?;

        self.state = next;
        self.positions.insert(trader, position);

        let payload = match change {
            PositionChange::Opened(_) => EventPayload::PositionOpened(PositionOpenedEvent {
                trader,
                size: position.size,
                margin: position.margin,
                entry_price: position.entry_price,
                fee: quote.fee,
            }),
            _ => EventPayload::PositionModified(PositionModifiedEvent {
                trader,
                old_size,
                new_size: position.size,
                entry_price: position.entry_price,
                margin: position.margin,
                fee: quote.fee,
            }),
        };
        self.log.emit(ctx.now, payload);
        tracing::debug!(
            trader = %trader,
            size_delta,
            new_size = position.size,
            price = quote.average_price,
            fee = quote.fee,
            "trade executed"
        );

        Ok(TradeResult {
            trader,
            size_delta,
            old_size,
            new_size: position.size,
            average_price: quote.average_price,
            quote_delta: quote.quote_delta,
            fee: quote.fee,
            margin: position.margin,
            entry_price: position.entry_price,
            mark_price,
            settlement: None,
        })
    }

    fn execute_close(&mut self, ctx: CallContext) -> Result<CloseResult, MarketError> {
        let trader = ctx.caller;
        let position = *self.position(trader).ok_or(MarketError::NoPosition(trader))?;

        let mut next = self.state;
        next.mark_to_market(ctx.now)?;

        let unwind = next.quote(-position.size)?;
        next.apply_trade(&unwind);

        let settlement = realize(
            trader,
            &position,
            position.margin,
            &unwind,
            next.cumulative_funding_rate,
        )?;
        self.pay_out(&[(trader, settlement.payout)])?;

        self.state = next;
        self.positions.remove(&trader);
        self.record_close(ctx.now, &settlement, CloseReason::UserClosed);

        Ok(settlement)
    }

    fn record_close(&mut self, now: Timestamp, settlement: &CloseResult, reason: CloseReason) {
        self.log.emit(
            now,
            EventPayload::PositionClosed(PositionClosedEvent {
                trader: settlement.trader,
                size: settlement.size,
                exit_price: settlement.exit_price,
                net_pnl: settlement.net_pnl,
                fee: settlement.fee,
                payout: settlement.payout,
                close_reason: reason,
            }),
        );
        tracing::info!(
            trader = %settlement.trader,
            size = settlement.size,
            pnl = settlement.net_pnl,
            payout = settlement.payout,
            "position closed"
        );

        if settlement.bad_debt > 0 {
            self.record_bad_debt(now, settlement.trader, settlement.bad_debt);
        }
    }

    pub(super) fn record_bad_debt(&mut self, now: Timestamp, trader: Address, amount: u128) {
        self.state.total_bad_debt = self.state.total_bad_debt.saturating_add(amount);
        self.log
            .emit(now, EventPayload::BadDebt(BadDebtEvent { trader, amount }));
        tracing::warn!(trader = %trader, amount, total = self.state.total_bad_debt, "bad debt absorbed");
    }
}
