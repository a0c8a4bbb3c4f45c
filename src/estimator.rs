// 4.0: variance estimation. EWMA over a squared percentage-change proxy.
// the proxy stands in for a squared log return: |p1 - p0| / p0, squared, on SCALE.
// it diverges from ln(p1/p0)^2 for large moves and that is accepted.

use crate::math::{isqrt, mul_add_div, mul_div, MathError, SCALE};

// 4.1: |price - last| / last on SCALE, squared back down to SCALE.
pub fn return_proxy(price: u128, last_price: u128) -> Result<u128, MathError> {
    let diff = price.abs_diff(last_price);
    let pct = mul_div(diff, SCALE, last_price)?;
    mul_div(pct, pct, SCALE)
}

// 4.2: lambda * old + (1 - lambda) * proxy. lambda is on SCALE and strictly inside (0, 1).
pub fn ewma_variance(lambda: u128, old_variance: u128, proxy: u128) -> Result<u128, MathError> {
    let complement = SCALE.checked_sub(lambda).ok_or(MathError::Overflow)?;
    mul_add_div(lambda, old_variance, complement, proxy, SCALE)
}

pub fn annualize_variance(variance: u128, annualization_factor: u128) -> Result<u128, MathError> {
    variance
        .checked_mul(annualization_factor)
        .ok_or(MathError::Overflow)
}

// 4.3: sqrt of the annualized variance. the result sits on sqrt(SCALE), i.e. 1e9.
pub fn annualize_volatility(variance: u128, annualization_factor: u128) -> Result<u128, MathError> {
    Ok(isqrt(annualize_variance(variance, annualization_factor)?))
}

// lambda must be strictly between 0 and 1.
pub fn is_valid_lambda(lambda: u128) -> bool {
    lambda > 0 && lambda < SCALE
}
