// volperp-core: realized-volatility index and a vAMM perpetual market on it.
// fixed-point first: every amount is an integer on 1e18, nothing touches floats.
// all computation is deterministic; the only I/O is the ledger and feed handed in.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, AssetId, Timestamp, CallContext, Side
//   2.x  math.rs: 256 bit mul_div, isqrt, ledger scale conversion
//   3.x  accumulator.rs: accumulate-before-mutate time integrals, TWAP
//   4.x  estimator.rs: return proxy, EWMA variance, annualization
//   5.x  position.rs: position struct, PnL, open/increase/reduce/flip merge
//   6.x  funding.rs: mark vs index TWAP premium, 1/24 per settlement
//   6.2  liquidation.rs: maintenance check, reward split, bad debt
//   6.3  vamm.rs: constant product pricing, fee injection
//   7.x  variance/: variance engine: sampling, views, VolatilityIndex
//   8.x  engine/: perpetual market: positions, funding, liquidations
//   9.x  ledger.rs: collateral ledger boundary (mocked)
//   9.1  price_feed.rs: price feed boundary (mocked)
//   10.x guard.rs: reentrancy guard
//   11.x events.rs: state transition events for audit
//   12.x config.rs: protocol config, env presets
//   13.x market.rs: market config + runtime state

// fixed-point core
pub mod accumulator;
pub mod estimator;
pub mod math;
pub mod types;

// market mechanics
pub mod funding;
pub mod liquidation;
pub mod position;
pub mod vamm;

// engines
pub mod engine;
pub mod market;
pub mod variance;

// integration modules
pub mod config;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod price_feed;

// re exports for convenience
pub use config::*;
pub use engine::*;
pub use events::*;
pub use guard::{ReentrancyGuard, Reentered};
pub use ledger::*;
pub use market::*;
pub use math::{wad, MathError, SCALE};
pub use position::{Position, PositionChange};
pub use price_feed::*;
pub use types::*;
pub use vamm::{TradeQuote, VammError};
pub use variance::*;
