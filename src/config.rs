// 12.0 config.rs: all settings in one place. index sampling, reserves, risk params.
// 12.1 ProtocolConfig bundles both engines' configs plus the collateral they settle in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineConfig, MarketError};
use crate::ledger::CollateralType;
use crate::market::MarketConfig;
use crate::math::{to_decimal_unsigned, wad};
use crate::variance::{VarianceConfig, VarianceError};

// The complete deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub collateral: CollateralType,
    pub variance: VarianceConfig,
    pub market: MarketConfig,
    pub engine: EngineConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            collateral: CollateralType::Usdc,
            variance: VarianceConfig::default(),
            market: MarketConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl ProtocolConfig {
    // Create a configuration preset for testnet: deeper leverage, shallow pool
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.market.risk.max_leverage = wad(20);
        config.market.risk.maintenance_margin_ratio = 25_000_000_000_000_000; // 2.5%
        config.market.risk.trading_fee_rate = 0;
        config.market.base_reserve = wad(100_000);
        config.market.quote_reserve = wad(20_000);
        config.engine.verbose = true;
        config
    }

    // Create a configuration preset for mainnet with conservative settings
    pub fn mainnet_conservative() -> Self {
        let mut config = Self::default();
        config.market.risk.max_leverage = wad(5);
        config.market.risk.maintenance_margin_ratio = 100_000_000_000_000_000; // 10%
        config.market.base_reserve = wad(10_000_000);
        config.market.quote_reserve = wad(2_000_000);
        config.variance.lambda = 970_000_000_000_000_000; // slower decay
        config.engine.max_events = 1_000_000;
        config
    }

    // Validate each engine's config, then the ones that only make sense together
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.variance.validate()?;
        self.market.validate()?;

        // the index must be refreshed at least once per funding window
        if self.variance.update_interval > self.market.risk.funding_interval {
            return Err(ConfigError::IntervalMismatch {
                update_interval: self.variance.update_interval,
                funding_interval: self.market.risk.funding_interval,
            });
        }

        if self.engine.max_events == 0 {
            return Err(ConfigError::InvalidEngine {
                reason: "max_events must be positive".to_string(),
            });
        }

        Ok(())
    }

    pub fn max_leverage(&self) -> Decimal {
        to_decimal_unsigned(self.market.risk.max_leverage)
    }

    pub fn initial_mark_price(&self) -> Decimal {
        crate::vamm::mark_price(self.market.base_reserve, self.market.quote_reserve)
            .map(to_decimal_unsigned)
            .unwrap_or(Decimal::ZERO)
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("variance config: {0}")]
    Variance(#[from] VarianceError),

    #[error("market config: {0}")]
    Market(#[from] MarketError),

    #[error("index update interval {update_interval}s exceeds funding interval {funding_interval}s")]
    IntervalMismatch { update_interval: u64, funding_interval: u64 },

    #[error("engine config: {reason}")]
    InvalidEngine { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> ProtocolConfig {
        match self {
            Environment::Development => ProtocolConfig::default(),
            Environment::Testnet => ProtocolConfig::testnet(),
            Environment::Mainnet => ProtocolConfig::mainnet_conservative(),
        }
    }
}
