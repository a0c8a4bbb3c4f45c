//! Variance engine configuration. Immutable after construction.

use super::results::VarianceError;
use crate::estimator::is_valid_lambda;
use crate::math::SCALE;
use crate::types::{Address, AssetId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceConfig {
    /// Price feed the updater samples from.
    pub feed: Address,
    /// The only identity allowed to submit samples.
    pub updater: Address,
    pub asset: AssetId,
    /// EWMA decay on SCALE, strictly inside (0, 1).
    pub lambda: u128,
    /// Samples per year, e.g. 8760 for hourly.
    pub annualization_factor: u128,
    /// Variance on SCALE before the first update.
    pub initial_variance: u128,
    /// Seconds between expected samples.
    pub update_interval: u64,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            feed: Address(0x4645_4544),
            updater: Address(0x5550_4454),
            asset: AssetId(1),
            lambda: 940_000_000_000_000_000,         // 0.94
            annualization_factor: 8_760,             // hourly samples
            initial_variance: 40_000_000_000_000_000, // 0.04
            update_interval: 3_600,
        }
    }
}

impl VarianceConfig {
    pub fn validate(&self) -> Result<(), VarianceError> {
        if self.feed.is_zero() {
            return Err(VarianceError::InvalidAddress("feed"));
        }
        if self.updater.is_zero() {
            return Err(VarianceError::InvalidAddress("updater"));
        }
        if !is_valid_lambda(self.lambda) {
            return Err(VarianceError::InvalidLambda(self.lambda));
        }
        if self.annualization_factor == 0 {
            return Err(VarianceError::InvalidAnnualizationFactor);
        }
        if self.update_interval == 0 {
            return Err(VarianceError::InvalidUpdateInterval);
        }
        Ok(())
    }

    /// 1 - lambda, the weight of a fresh sample.
    pub fn sample_weight(&self) -> u128 {
        SCALE.saturating_sub(self.lambda)
    }
}
