// Price Feed Integration
//
// The variance engine samples an external spot price. The engine does not care whether it
// comes from Pyth, Chainlink or a CEX aggregator; anything that can answer `mark_price`
// for an asset id implements PriceFeed. Any error fails the sample attempt.

use crate::types::AssetId;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("no price available for {0}")]
    NoPriceAvailable(AssetId),

    #[error("feed returned an empty price for {0}")]
    EmptyPrice(AssetId),

    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

pub trait PriceFeed {
    /// Latest price for `asset` on the engine's fixed-point scale.
    fn mark_price(&self, asset: AssetId) -> Result<u128, FeedError>;
}

/// A feed that serves whatever was last set. Used by tests and the simulation.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceFeed {
    prices: HashMap<AssetId, u128>,
    outage: Option<String>,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, asset: AssetId, price: u128) -> Self {
        self.set_price(asset, price);
        self
    }

    pub fn set_price(&mut self, asset: AssetId, price: u128) {
        self.prices.insert(asset, price);
    }

    /// Simulate an outage; every read fails until cleared with `None`.
    pub fn set_outage(&mut self, reason: Option<String>) {
        self.outage = reason;
    }
}

impl PriceFeed for StaticPriceFeed {
    fn mark_price(&self, asset: AssetId) -> Result<u128, FeedError> {
        if let Some(reason) = &self.outage {
            return Err(FeedError::Unavailable(reason.clone()));
        }
        match self.prices.get(&asset) {
            Some(0) => Err(FeedError::EmptyPrice(asset)),
            Some(price) => Ok(*price),
            None => Err(FeedError::NoPriceAvailable(asset)),
        }
    }
}

impl<F: PriceFeed + ?Sized> PriceFeed for &F {
    fn mark_price(&self, asset: AssetId) -> Result<u128, FeedError> {
        (**self).mark_price(asset)
    }
}
