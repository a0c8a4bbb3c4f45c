// 7.0.2: sample outcomes and errors. every error is returned before any state is written.

use crate::math::MathError;
use crate::price_feed::FeedError;
use crate::types::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleOutcome {
    // first accepted price. variance untouched.
    Seeded {
        price: u128,
    },
    Updated {
        return_proxy: u128,
        old_variance: u128,
        new_variance: u128,
        annualized_volatility: u128,
    },
}

impl SampleOutcome {
    pub fn is_seed(&self) -> bool {
        matches!(self, SampleOutcome::Seeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VarianceError {
    #[error("{0} is not the designated updater")]
    Unauthorized(Address),

    #[error("price must be non-zero")]
    ZeroPrice,

    #[error("invalid {0} address")]
    InvalidAddress(&'static str),

    #[error("lambda {0} outside (0, 1)")]
    InvalidLambda(u128),

    #[error("annualization factor must be positive")]
    InvalidAnnualizationFactor,

    #[error("update interval must be positive")]
    InvalidUpdateInterval,

    #[error("price feed unavailable: {0}")]
    FeedUnavailable(#[from] FeedError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}
