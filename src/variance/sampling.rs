//! Sample ingestion.
//!
//! Order matters: the accumulator folds in the volatility that held since the
//! last checkpoint before the new price can move the variance. Everything is
//! computed on a copy of the state and committed in one assignment.

use super::core::VarianceEngine;
use super::results::{SampleOutcome, VarianceError};
use crate::accumulator;
use crate::estimator::{annualize_volatility, ewma_variance, return_proxy};
use crate::events::{EventPayload, PriceSeededEvent, VarianceUpdatedEvent};
use crate::price_feed::PriceFeed;
use crate::types::CallContext;

impl VarianceEngine {
    /// Accept a price from the designated updater.
    pub fn take_sample(&mut self, ctx: CallContext, price: u128) -> Result<SampleOutcome, VarianceError> {
        if ctx.caller != self.config.updater {
            tracing::warn!(caller = %ctx.caller, "sample rejected: unauthorized");
            return Err(VarianceError::Unauthorized(ctx.caller));
        }
        if price == 0 {
            return Err(VarianceError::ZeroPrice);
        }

        let mut next = self.state;

        let (cumulative, checkpoint) = accumulator::accrue(
            next.cumulative_volatility,
            next.last_accumulator_update_time,
            self.annualized_volatility()?,
            ctx.now,
        )?;
        next.cumulative_volatility = cumulative;
        next.last_accumulator_update_time = checkpoint;

        if !next.is_seeded() {
            next.last_price = price;
            next.last_update_time = ctx.now;

            next.sample_count += 1;
            self.state = next;
            self.log
                .emit(ctx.now, EventPayload::PriceSeeded(PriceSeededEvent { price }));
            tracing::debug!(price, "variance engine seeded");
            return Ok(SampleOutcome::Seeded { price });
        }

        let proxy = return_proxy(price, next.last_price)?;
        let old_variance = next.current_variance;
        let new_variance = ewma_variance(self.config.lambda, old_variance, proxy)?;
        let annualized_volatility = annualize_volatility(new_variance, self.config.annualization_factor)?;

        next.current_variance = new_variance;
        next.last_price = price;
        next.last_update_time = next.last_update_time.max(ctx.now);

        next.sample_count += 1;
        self.state = next;
        self.log.emit(
            ctx.now,
            EventPayload::VarianceUpdated(VarianceUpdatedEvent {
                price,
                return_proxy: proxy,
                old_variance,
                new_variance,
                annualized_volatility,
            }),
        );
        tracing::debug!(price, proxy, old_variance, new_variance, "variance updated");

        Ok(SampleOutcome::Updated {
            return_proxy: proxy,
            old_variance,
            new_variance,
            annualized_volatility,
        })
    }

    /// Read the configured asset from `feed` and ingest it. A feed failure
    /// leaves the engine untouched.
    pub fn sample_from_feed<F: PriceFeed>(
        &mut self,
        ctx: CallContext,
        feed: &F,
    ) -> Result<SampleOutcome, VarianceError> {
        if ctx.caller != self.config.updater {
            return Err(VarianceError::Unauthorized(ctx.caller));
        }
        let price = feed.mark_price(self.config.asset).map_err(|e| {
            tracing::warn!(asset = %self.config.asset, error = %e, "price feed read failed");
            VarianceError::FeedUnavailable(e)
        })?;
        self.take_sample(ctx, price)
    }
}
