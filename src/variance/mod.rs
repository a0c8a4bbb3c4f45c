// 7.0: variance engine. ingests price samples from the designated updater, keeps an EWMA
// variance and exposes a time-integrated volatility reading the market funds against.
// one asset per engine. scheduling is external; the engine only answers "is an update due".

mod config;
mod core;
mod index;
mod results;
mod sampling;

pub use config::VarianceConfig;
pub use core::{VarianceEngine, VarianceState};
pub use index::VolatilityIndex;
pub use results::{SampleOutcome, VarianceError};
