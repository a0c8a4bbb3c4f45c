// 7.1 variance/core.rs: engine struct, persisted state and read-only views.

use super::config::VarianceConfig;
use super::results::VarianceError;
use crate::accumulator;
use crate::engine::EngineConfig;
use crate::estimator::{annualize_variance, annualize_volatility};
use crate::events::{Event, EventLog};
use crate::math::MathError;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Everything the engine persists between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceState {
    pub current_variance: u128,
    /// Zero until the first sample is accepted.
    pub last_price: u128,
    pub last_update_time: Timestamp,
    /// Annualized volatility integrated over time (vol·seconds).
    pub cumulative_volatility: u128,
    pub last_accumulator_update_time: Timestamp,
    /// Samples accepted so far, seeds included.
    pub sample_count: u64,
}

impl VarianceState {
    pub fn new(initial_variance: u128, now: Timestamp) -> Self {
        Self {
            current_variance: initial_variance,
            last_price: 0,
            last_update_time: now,
            cumulative_volatility: 0,
            last_accumulator_update_time: now,
            sample_count: 0,
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.last_price != 0
    }
}

#[derive(Debug, Clone)]
pub struct VarianceEngine {
    pub(super) config: VarianceConfig,
    pub(super) state: VarianceState,
    pub(super) log: EventLog,
}

impl VarianceEngine {
    pub fn new(config: VarianceConfig, engine: EngineConfig, now: Timestamp) -> Result<Self, VarianceError> {
        config.validate()?;
        let state = VarianceState::new(config.initial_variance, now);
        tracing::debug!(
            asset = %config.asset,
            updater = %config.updater,
            lambda = config.lambda,
            "variance engine created"
        );
        Ok(Self {
            config,
            state,
            log: EventLog::new(engine),
        })
    }

    /// Rebuild an engine from persisted state.
    pub fn restore(
        config: VarianceConfig,
        engine: EngineConfig,
        state: VarianceState,
    ) -> Result<Self, VarianceError> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            log: EventLog::new(engine),
        })
    }

    pub fn config(&self) -> &VarianceConfig {
        &self.config
    }

    pub fn state(&self) -> VarianceState {
        self.state
    }

    pub fn current_variance(&self) -> u128 {
        self.state.current_variance
    }

    pub fn last_price(&self) -> u128 {
        self.state.last_price
    }

    pub fn last_update_time(&self) -> Timestamp {
        self.state.last_update_time
    }

    pub fn sample_count(&self) -> u64 {
        self.state.sample_count
    }

    pub fn annualized_variance(&self) -> Result<u128, MathError> {
        annualize_variance(self.state.current_variance, self.config.annualization_factor)
    }

    pub fn annualized_volatility(&self) -> Result<u128, MathError> {
        annualize_volatility(self.state.current_variance, self.config.annualization_factor)
    }

    /// The accumulator projected to `now`. Identical to what a sample at `now`
    /// would persist before touching the variance.
    pub fn cumulative_volatility(&self, now: Timestamp) -> Result<u128, MathError> {
        accumulator::project(
            self.state.cumulative_volatility,
            self.state.last_accumulator_update_time,
            self.annualized_volatility()?,
            now,
        )
    }

    pub fn next_update_due(&self) -> Timestamp {
        self.state.last_update_time.plus(self.config.update_interval)
    }

    // an engine that has never been seeded is always due
    pub fn is_update_due(&self, now: Timestamp) -> bool {
        !self.state.is_seeded() || now >= self.next_update_due()
    }

    pub fn events(&self) -> &[Event] {
        self.log.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.log.recent(count)
    }
}
