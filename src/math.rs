// 2.0: fixed-point math. every monetary quantity is an integer on SCALE (1e18).
// products go through 256 bit intermediates, division truncates toward zero.
// nothing here allocates or touches floats; Decimal is only for display.

use ethnum::{I256, U256};
use rust_decimal::Decimal;

pub const SCALE: u128 = 1_000_000_000_000_000_000;
pub const SCALE_I: i128 = SCALE as i128;
pub const SCALE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("fixed-point overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("ledger decimals {0} exceed the internal scale")]
    UnsupportedDecimals(u32),
}

// 2.1: a * b / d with the product held in 256 bits.
pub fn mul_div(a: u128, b: u128, d: u128) -> Result<u128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let q = U256::new(a) * U256::new(b) / U256::new(d);
    let (hi, lo) = q.into_words();
    if hi != 0 {
        return Err(MathError::Overflow);
    }
    Ok(lo)
}

pub fn mul_div_signed(a: i128, b: i128, d: i128) -> Result<i128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let q = I256::new(a) * I256::new(b) / I256::new(d);
    if q > I256::new(i128::MAX) || q < I256::new(i128::MIN) {
        return Err(MathError::Overflow);
    }
    Ok(q.as_i128())
}

// (a * x + b * y) / d, one truncation at the end.
pub fn mul_add_div(a: u128, x: u128, b: u128, y: u128, d: u128) -> Result<u128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let lhs = U256::new(a) * U256::new(x);
    let rhs = U256::new(b) * U256::new(y);
    let sum = lhs.checked_add(rhs).ok_or(MathError::Overflow)?;
    let (hi, lo) = (sum / U256::new(d)).into_words();
    if hi != 0 {
        return Err(MathError::Overflow);
    }
    Ok(lo)
}

pub fn wad_mul(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, b, SCALE)
}

pub fn wad_div(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div(a, SCALE, b)
}

pub fn to_signed(value: u128) -> Result<i128, MathError> {
    i128::try_from(value).map_err(|_| MathError::Overflow)
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

pub fn checked_add_signed(a: i128, b: i128) -> Result<i128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

// 2.2: babylonian integer square root. isqrt(0) = 0.
pub fn isqrt(x: u128) -> u128 {
    if x == 0 {
        return 0;
    }
    let mut y = x;
    let mut z = x / 2 + (x & 1);
    while z < y {
        y = z;
        z = (x / z + z) / 2;
    }
    y
}

// 2.3: ledger boundary. internal SCALE <-> a token with `decimals` places.
fn native_factor(decimals: u32) -> Result<u128, MathError> {
    if decimals > SCALE_DECIMALS {
        return Err(MathError::UnsupportedDecimals(decimals));
    }
    Ok(10u128.pow(SCALE_DECIMALS - decimals))
}

pub fn to_native_floor(amount: u128, decimals: u32) -> Result<u128, MathError> {
    Ok(amount / native_factor(decimals)?)
}

// used when pulling funds so the market never collects less than it credits.
pub fn to_native_ceil(amount: u128, decimals: u32) -> Result<u128, MathError> {
    let factor = native_factor(decimals)?;
    let whole = amount / factor;
    Ok(if amount % factor == 0 { whole } else { whole + 1 })
}

pub fn from_native(amount: u128, decimals: u32) -> Result<u128, MathError> {
    amount
        .checked_mul(native_factor(decimals)?)
        .ok_or(MathError::Overflow)
}

// 2.4: human readable rendering. display only, never fed back into the math.
pub fn to_decimal(value: i128) -> Decimal {
    Decimal::try_from_i128_with_scale(value, SCALE_DECIMALS)
        .or_else(|_| Decimal::try_from_i128_with_scale(value / 1_000_000_000, 9))
        .map(|d| d.normalize())
        .unwrap_or(if value < 0 { Decimal::MIN } else { Decimal::MAX })
}

pub fn to_decimal_unsigned(value: u128) -> Decimal {
    match i128::try_from(value) {
        Ok(v) => to_decimal(v),
        Err(_) => Decimal::MAX,
    }
}

// shorthand for whole units on SCALE, mostly for tests and presets.
pub const fn wad(units: u128) -> u128 {
    units * SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mul_div_wide_intermediate() {
        // 200_000e18 * 1_000e18 overflows u128 before the division.
        let q = mul_div(wad(200_000), wad(1_000), wad(999_000)).unwrap();
        assert_eq!(q, 200_200_200_200_200_200_200);
    }

    #[test]
    fn mul_div_rejects_zero_divisor_and_overflow() {
        assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, u128::MAX, 1), Err(MathError::Overflow));
    }

    #[test]
    fn signed_division_truncates_toward_zero() {
        assert_eq!(mul_div_signed(-7, 1, 2).unwrap(), -3);
        assert_eq!(mul_div_signed(7, 1, 2).unwrap(), 3);
        assert_eq!(mul_div_signed(-(wad(5) as i128), wad(1_000) as i128, SCALE_I).unwrap(), -(wad(5_000) as i128));
    }

    #[test]
    fn isqrt_values() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(100), 10);
        assert_eq!(isqrt(u128::MAX), u64::MAX as u128);
    }

    #[test]
    fn native_conversion_usdc() {
        // 1.5 USDC
        let amount = 1_500_000_000_000_000_000u128;
        assert_eq!(to_native_floor(amount, 6).unwrap(), 1_500_000);
        assert_eq!(from_native(1_500_000, 6).unwrap(), amount);

        // dust below one native unit
        assert_eq!(to_native_floor(amount + 1, 6).unwrap(), 1_500_000);
        assert_eq!(to_native_ceil(amount + 1, 6).unwrap(), 1_500_001);
        assert_eq!(to_native_ceil(amount, 6).unwrap(), 1_500_000);
    }

    #[test]
    fn native_conversion_rejects_wide_tokens() {
        assert_eq!(to_native_floor(1, 24), Err(MathError::UnsupportedDecimals(24)));
    }

    #[test]
    fn decimal_rendering() {
        assert_eq!(to_decimal(37_700_000_000_000_000), dec!(0.0377));
        assert_eq!(to_decimal(-(wad(3) as i128)), dec!(-3));
    }
}
