//! Price views. Nothing here mutates the market.

use super::core::PerpetualMarket;
use super::results::MarketError;
use crate::accumulator::twap;
use crate::ledger::CollateralLedger;
use crate::types::Timestamp;
use crate::vamm::TradeQuote;
use crate::variance::VolatilityIndex;

impl<I: VolatilityIndex, L: CollateralLedger> PerpetualMarket<I, L> {
    /// vAMM-implied price of one unit of the index.
    pub fn mark_price(&self) -> Result<u128, MarketError> {
        self.state.mark_price()
    }

    /// (base, quote)
    pub fn reserves(&self) -> (u128, u128) {
        (self.state.base_reserve, self.state.quote_reserve)
    }

    /// Mark TWAP over the current funding window, projected to `now`.
    pub fn mark_twap(&self, now: Timestamp) -> Result<u128, MarketError> {
        let cumulative = self.state.projected_mark_cumulative(now)?;
        Ok(twap(
            cumulative,
            self.state.mark_cumulative_at_last_funding,
            now.elapsed_since(self.state.last_funding_time),
        ))
    }

    /// Index TWAP over the current funding window, projected to `now`.
    pub fn index_twap(&self, now: Timestamp) -> Result<u128, MarketError> {
        let cumulative = self.index.cumulative_volatility(now)?;
        Ok(twap(
            cumulative,
            self.state.index_cumulative_at_last_funding,
            now.elapsed_since(self.state.last_funding_time),
        ))
    }

    /// Preview a trade of `size_delta` against the current reserves.
    pub fn quote_trade(&self, size_delta: i128) -> Result<TradeQuote, MarketError> {
        self.state.quote(size_delta)
    }

    pub fn next_funding_time(&self) -> Timestamp {
        self.state.next_funding_time()
    }

    pub fn is_funding_due(&self, now: Timestamp) -> bool {
        self.state.is_funding_due(now)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{EngineConfig, PerpetualMarket};
    use crate::ledger::{CollateralType, InMemoryLedger};
    use crate::market::MarketConfig;
    use crate::math::wad;
    use crate::types::{Address, CallContext, Timestamp};
    use crate::variance::{VarianceConfig, VarianceEngine};

    const BOB: Address = Address(0xb0b);

    fn market() -> PerpetualMarket<VarianceEngine, InMemoryLedger> {
        let t0 = Timestamp::from_secs(0);
        let index = VarianceEngine::new(VarianceConfig::default(), EngineConfig::default(), t0).unwrap();
        let config = MarketConfig::default();
        let mut ledger = InMemoryLedger::new(CollateralType::Dai);
        ledger.mint(BOB, wad(1_000_000));
        ledger.approve(BOB, config.market, u128::MAX);
        PerpetualMarket::new(config, EngineConfig::default(), index, ledger, t0).unwrap()
    }

    #[test]
    fn preview_matches_execution() {
        let mut market = market();
        let preview = market.quote_trade(wad(1_000) as i128).unwrap();
        let result = market
            .open_or_modify(CallContext::at(BOB, 0), wad(1_000) as i128, wad(100))
            .unwrap();

        assert_eq!(result.average_price, preview.average_price);
        assert_eq!(result.fee, preview.fee);
        assert_eq!(market.reserves(), (preview.new_base_reserve, preview.new_quote_reserve));
    }

    #[test]
    fn mark_twap_weights_by_time() {
        let mut market = market();
        let p0 = market.mark_price().unwrap();

        market
            .open_or_modify(CallContext::at(BOB, 1_800), wad(1_000) as i128, wad(100))
            .unwrap();
        let p1 = market.mark_price().unwrap();

        // half the window at p0, half at p1
        assert_eq!(market.mark_twap(Timestamp::from_secs(3_600)).unwrap(), (p0 + p1) / 2);
        assert_eq!(market.mark_twap(Timestamp::from_secs(0)).unwrap(), 0);
    }

    #[test]
    fn index_twap_tracks_volatility() {
        let market = market();
        let vol = market.index().annualized_volatility().unwrap();
        assert_eq!(market.index_twap(Timestamp::from_secs(3_600)).unwrap(), vol);
    }
}
