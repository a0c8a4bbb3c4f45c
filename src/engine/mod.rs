// 8.0: perpetual market engine. one vAMM market on the volatility index: position
// lifecycle, funding settlement and liquidation. deterministic, no I/O besides the
// collateral ledger and index it is handed.

mod config;
mod core;
mod funding;
mod liquidations;
mod positions;
mod pricing;
mod results;

pub use config::EngineConfig;
pub use core::PerpetualMarket;
pub use results::{CloseResult, FundingResult, LiquidationResult, MarketError, PositionHealth, TradeResult};
