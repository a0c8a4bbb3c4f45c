//! Funding rate settlement.

use super::core::PerpetualMarket;
use super::results::{FundingResult, MarketError};
use crate::events::{EventPayload, FundingSettledEvent};
use crate::funding::funding_window;
use crate::ledger::CollateralLedger;
use crate::math::checked_add_signed;
use crate::types::CallContext;
use crate::variance::VolatilityIndex;

impl<I: VolatilityIndex, L: CollateralLedger> PerpetualMarket<I, L> {
    /// Settle funding for the window since the last settlement. Anyone may
    /// call once `funding_interval` has passed.
    pub fn settle_funding(&mut self, ctx: CallContext) -> Result<FundingResult, MarketError> {
        self.non_reentrant(|market| market.execute_funding(ctx))
    }

    fn execute_funding(&mut self, ctx: CallContext) -> Result<FundingResult, MarketError> {
        if !self.state.is_funding_due(ctx.now) {
            return Err(MarketError::FundingTooEarly {
                next: self.state.next_funding_time(),
            });
        }

        let mut next = self.state;
        next.mark_to_market(ctx.now)?;

        let index_cumulative = self.index.cumulative_volatility(ctx.now)?;
        let window = funding_window(
            next.cumulative_mark_price,
            next.mark_cumulative_at_last_funding,
            index_cumulative,
            next.index_cumulative_at_last_funding,
            ctx.now.elapsed_since(next.last_funding_time),
        )?;

        next.cumulative_funding_rate = checked_add_signed(next.cumulative_funding_rate, window.funding_rate)?;
        next.mark_cumulative_at_last_funding = next.cumulative_mark_price;
        next.index_cumulative_at_last_funding = index_cumulative;
        next.last_funding_time = ctx.now;

        self.state = next;
        self.log.emit(
            ctx.now,
            EventPayload::FundingSettled(FundingSettledEvent {
                mark_twap: window.mark_twap,
                index_twap: window.index_twap,
                premium: window.premium,
                funding_rate: window.funding_rate,
                cumulative_funding_rate: next.cumulative_funding_rate,
            }),
        );
        tracing::info!(
            mark_twap = window.mark_twap,
            index_twap = window.index_twap,
            rate = window.funding_rate,
            cumulative = next.cumulative_funding_rate,
            "funding settled"
        );

        Ok(FundingResult {
            elapsed_secs: window.elapsed_secs,
            mark_twap: window.mark_twap,
            index_twap: window.index_twap,
            premium: window.premium,
            funding_rate: window.funding_rate,
            cumulative_funding_rate: next.cumulative_funding_rate,
            next_funding_time: next.next_funding_time(),
        })
    }
}
