// 7.3: the read side the perpetual market consumes. anything that can project a
// cumulative volatility reading to a point in time can serve as the market's index.

use super::core::VarianceEngine;
use crate::math::MathError;
use crate::types::Timestamp;
use std::cell::RefCell;
use std::rc::Rc;

pub trait VolatilityIndex {
    /// Time-integrated annualized volatility as of `now`, without mutating anything.
    fn cumulative_volatility(&self, now: Timestamp) -> Result<u128, MathError>;

    /// Current annualized volatility (sqrt scale, 1e9).
    fn annualized_volatility(&self) -> Result<u128, MathError>;
}

impl VolatilityIndex for VarianceEngine {
    fn cumulative_volatility(&self, now: Timestamp) -> Result<u128, MathError> {
        VarianceEngine::cumulative_volatility(self, now)
    }

    fn annualized_volatility(&self) -> Result<u128, MathError> {
        VarianceEngine::annualized_volatility(self)
    }
}

impl<T: VolatilityIndex + ?Sized> VolatilityIndex for &T {
    fn cumulative_volatility(&self, now: Timestamp) -> Result<u128, MathError> {
        (**self).cumulative_volatility(now)
    }

    fn annualized_volatility(&self) -> Result<u128, MathError> {
        (**self).annualized_volatility()
    }
}

// shared handle: the updater keeps sampling while the market reads.
impl<T: VolatilityIndex> VolatilityIndex for Rc<RefCell<T>> {
    fn cumulative_volatility(&self, now: Timestamp) -> Result<u128, MathError> {
        self.borrow().cumulative_volatility(now)
    }

    fn annualized_volatility(&self) -> Result<u128, MathError> {
        self.borrow().annualized_volatility()
    }
}
