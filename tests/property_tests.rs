//! Property-based tests for the fixed-point core.
//!
//! These tests verify invariants hold under random inputs.

use ethnum::U256;
use proptest::prelude::*;
use volperp_core::accumulator::{project, twap};
use volperp_core::estimator::return_proxy;
use volperp_core::math::{isqrt, mul_div, SCALE};
use volperp_core::position::price_pnl;
use volperp_core::vamm::quote_trade;
use volperp_core::*;

const TRADER: Address = Address(0x7a);

// Strategies for generating test data
fn lambda_strategy() -> impl Strategy<Value = u128> {
    1u128..SCALE
}

fn variance_strategy() -> impl Strategy<Value = u128> {
    0u128..SCALE
}

fn price_strategy() -> impl Strategy<Value = u128> {
    1_000_000u128..10_000_000_000_000_000_000 // 1e-12 to 1e19 units of SCALE
}

fn reserve_strategy() -> impl Strategy<Value = u128> {
    (1u128..10_000_000).prop_map(wad)
}

fn funded_market() -> PerpetualMarket<VarianceEngine, InMemoryLedger> {
    let t0 = Timestamp::from_secs(0);
    let index = VarianceEngine::new(VarianceConfig::default(), EngineConfig::default(), t0).unwrap();
    let config = MarketConfig::default();
    let mut ledger = InMemoryLedger::new(CollateralType::Dai);
    ledger.mint(TRADER, wad(1_000_000_000));
    ledger.approve(TRADER, config.market, u128::MAX);
    PerpetualMarket::new(config, EngineConfig::default(), index, ledger, t0).unwrap()
}

proptest! {
    /// variance' = (lambda·variance + (1−lambda)·proxy) / SCALE, one truncation
    #[test]
    fn ewma_update_is_exact(
        lambda in lambda_strategy(),
        initial in variance_strategy(),
        p0 in price_strategy(),
        move_permille in 1u128..11_000,
    ) {
        let p1 = (p0 * move_permille / 1_000).max(1);
        let config = VarianceConfig {
            lambda,
            initial_variance: initial,
            ..VarianceConfig::default()
        };
        let updater = config.updater;
        let mut engine = VarianceEngine::new(config, EngineConfig::default(), Timestamp::from_secs(0)).unwrap();

        engine.take_sample(CallContext::at(updater, 0), p0).unwrap();
        engine.take_sample(CallContext::at(updater, 3_600), p1).unwrap();

        let diff = p0.abs_diff(p1);
        let pct = diff * SCALE / p0;
        let proxy = pct * pct / SCALE;
        let expected = (U256::new(lambda) * U256::new(initial)
            + U256::new(SCALE - lambda) * U256::new(proxy))
            / U256::new(SCALE);

        prop_assert_eq!(return_proxy(p1, p0).unwrap(), proxy);
        prop_assert_eq!(U256::new(engine.current_variance()), expected);
    }

    /// isqrt(x)² ≤ x < (isqrt(x) + 1)²
    #[test]
    fn isqrt_brackets_the_root(x in any::<u128>()) {
        let r = U256::new(isqrt(x));
        let x = U256::new(x);
        prop_assert!(r * r <= x);
        prop_assert!((r + U256::ONE) * (r + U256::ONE) > x);
    }

    /// Re-deriving volatility from the same variance is idempotent
    #[test]
    fn volatility_is_idempotent(variance in variance_strategy(), factor in 1u128..100_000) {
        let config = VarianceConfig {
            initial_variance: variance,
            annualization_factor: factor,
            ..VarianceConfig::default()
        };
        let engine = VarianceEngine::new(config, EngineConfig::default(), Timestamp::from_secs(0)).unwrap();
        let first = engine.annualized_volatility().unwrap();
        prop_assert_eq!(first, engine.annualized_volatility().unwrap());
        prop_assert_eq!(first, isqrt(variance * factor));
    }

    /// Without fees x·y only moves by rounding; fees only ever add quote
    #[test]
    fn constant_product_preserved(
        base in reserve_strategy(),
        quote in reserve_strategy(),
        size_permille in 1u128..900,
        long in any::<bool>(),
    ) {
        let size = (base / 1_000 * size_permille).max(1) as i128;
        let delta = if long { size } else { -size };

        let plain = quote_trade(base, quote, delta, 0).unwrap();
        let k0 = U256::new(base) * U256::new(quote);
        let k1 = U256::new(plain.new_base_reserve) * U256::new(plain.new_quote_reserve);
        let slack = U256::new(plain.new_base_reserve);
        prop_assert!(k1 + slack >= k0);
        prop_assert!(k1 <= k0 + slack);

        let with_fee = quote_trade(base, quote, delta, 1_000_000_000_000_000).unwrap();
        prop_assert_eq!(with_fee.new_base_reserve, plain.new_base_reserve);
        prop_assert_eq!(with_fee.new_quote_reserve, plain.new_quote_reserve + with_fee.fee);
    }

    /// A rejected open leaves reserves, positions and balances byte-identical
    #[test]
    fn leverage_breach_is_atomic(
        size_units in 1u128..200_000,
        margin_units in 1u128..20_000,
        long in any::<bool>(),
    ) {
        let mut market = funded_market();
        let before = market.state();
        let balance = market.ledger().balance_of(TRADER);
        let size = wad(size_units) as i128;
        let delta = if long { size } else { -size };

        match market.open_or_modify(CallContext::at(TRADER, 60), delta, wad(margin_units)) {
            Ok(result) => {
                let notional = market.notional(TRADER).unwrap();
                prop_assert!(mul_div(notional, SCALE, result.margin).unwrap() <= market.state().risk.max_leverage);
            }
            Err(MarketError::ExceedsMaxLeverage { .. }) | Err(MarketError::InvalidMargin) => {
                prop_assert_eq!(market.state(), before);
                prop_assert!(market.position(TRADER).is_none());
                prop_assert_eq!(market.ledger().balance_of(TRADER), balance);
                prop_assert!(market.events().is_empty());
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// PnL sign is correct for longs and shorts
    #[test]
    fn pnl_sign(
        size in 1i128..1_000_000_000_000_000_000_000,
        entry in price_strategy(),
        exit in price_strategy(),
    ) {
        let long = price_pnl(size, entry, exit).unwrap();
        let short = price_pnl(-size, entry, exit).unwrap();
        if exit > entry {
            prop_assert!(long >= 0 && short <= 0);
        } else if exit < entry {
            prop_assert!(long <= 0 && short >= 0);
        } else {
            prop_assert_eq!(long, 0);
            prop_assert_eq!(short, 0);
        }
    }

    /// A constant value averages to itself over any window
    #[test]
    fn twap_of_constant(value in 0u128..SCALE, start in 0u64..1_000_000, elapsed in 1u64..1_000_000) {
        let t0 = Timestamp::from_secs(start);
        let cumulative = project(0, t0, value, t0.plus(elapsed)).unwrap();
        prop_assert_eq!(twap(cumulative, 0, elapsed), value);
    }
}
