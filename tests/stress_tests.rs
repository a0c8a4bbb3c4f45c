//! Stress tests
//!
//! These tests simulate extreme market conditions to verify the market remains
//! consistent and behaves correctly under stress.

use std::cell::RefCell;
use std::rc::Rc;

use volperp_core::*;

const KEEPER: Address = Address(0xcee9);

type SharedIndex = Rc<RefCell<VarianceEngine>>;

fn setup(traders: &[Address], funds: u128) -> (SharedIndex, PerpetualMarket<SharedIndex, InMemoryLedger>) {
    let t0 = Timestamp::from_secs(0);
    let index = Rc::new(RefCell::new(
        VarianceEngine::new(VarianceConfig::default(), EngineConfig::default(), t0).unwrap(),
    ));
    let config = MarketConfig::default();
    let mut ledger = InMemoryLedger::new(CollateralType::Dai);
    for trader in traders {
        ledger.mint(*trader, funds);
        ledger.approve(*trader, config.market, u128::MAX);
    }
    let market = PerpetualMarket::new(config, EngineConfig::default(), index.clone(), ledger, t0).unwrap();
    (index, market)
}

fn traders(count: u64) -> Vec<Address> {
    (1..=count).map(|i| Address(0x1000 + i)).collect()
}

fn balances(market: &PerpetualMarket<SharedIndex, InMemoryLedger>, holders: &[Address]) -> u128 {
    holders.iter().map(|h| market.ledger().balance_of(*h)).sum::<u128>()
        + market.ledger().balance_of(market.config().market)
        + market.ledger().balance_of(KEEPER)
}

/// Tests rapid price movements and cascading liquidations.
mod cascade_tests {
    use super::*;

    #[test]
    fn liquidation_cascade_stays_consistent() {
        let longs = traders(10);
        let whale = Address(0x3a1e);
        let mut everyone = longs.clone();
        everyone.push(whale);
        let (_, mut market) = setup(&everyone, wad(10_000_000));
        let total = balances(&market, &everyone);

        // increasingly aggressive longs, all opened at roughly the same mark
        for (i, trader) in longs.iter().enumerate() {
            let margin = wad(1_000) - wad(75) * i as u128;
            market
                .open_or_modify(CallContext::at(*trader, 0), wad(10_000) as i128, margin)
                .unwrap();
        }
        assert_eq!(market.open_positions(), 10);

        // the whale dumps in steps, the keeper sweeps after each one
        let mut liquidated = 0;
        for step in 1..=6u64 {
            market
                .open_or_modify(CallContext::at(whale, step * 60), -(wad(50_000) as i128), wad(50_000))
                .unwrap();
            // each unwind sells into the pool, so sweep until nothing is left to take
            loop {
                let mut swept = false;
                for trader in &longs {
                    if market.is_liquidatable(*trader).unwrap() {
                        let result = market.liquidate(CallContext::at(KEEPER, step * 60), *trader).unwrap();
                        assert_eq!(result.to_liquidator + result.to_trader, result.final_collateral.max(0) as u128);
                        liquidated += 1;
                        swept = true;
                    }
                }
                if !swept {
                    break;
                }
            }
        }

        assert!(liquidated > 0, "the dump should liquidate at least the weakest long");
        assert!(market.ledger().balance_of(KEEPER) > 0);
        assert_eq!(balances(&market, &everyone), total);
        for trader in &longs {
            if market.position(*trader).is_some() {
                assert!(!market.is_liquidatable(*trader).unwrap());
            }
        }
    }

    #[test]
    fn weakest_positions_fall_first() {
        let strong = Address(0x5001);
        let weak = Address(0x5002);
        let whale = Address(0x3a1e);
        let (_, mut market) = setup(&[strong, weak, whale], wad(10_000_000));

        market
            .open_or_modify(CallContext::at(strong, 0), wad(10_000) as i128, wad(1_000))
            .unwrap();
        market
            .open_or_modify(CallContext::at(weak, 0), wad(10_000) as i128, wad(220))
            .unwrap();

        let mut weak_first = None;
        for step in 1..=20u64 {
            market
                .open_or_modify(CallContext::at(whale, step * 60), -(wad(10_000) as i128), wad(10_000))
                .unwrap();
            let weak_gone = market.is_liquidatable(weak).unwrap();
            let strong_gone = market.is_liquidatable(strong).unwrap();
            if weak_gone || strong_gone {
                weak_first = Some(weak_gone && !strong_gone);
                break;
            }
        }
        assert_eq!(weak_first, Some(true));
    }

    #[test]
    fn bad_debt_is_recorded_not_paid() {
        let reckless = Address(0xbad);
        let whale = Address(0x3a1e);
        let (_, mut market) = setup(&[reckless, whale], wad(10_000_000));

        market
            .open_or_modify(CallContext::at(reckless, 0), wad(10_000) as i128, wad(210))
            .unwrap();
        // a single huge dump skips straight past the maintenance band
        market
            .open_or_modify(CallContext::at(whale, 60), -(wad(400_000) as i128), wad(100_000))
            .unwrap();

        let before = market.ledger().balance_of(reckless);
        let result = market.liquidate(CallContext::at(KEEPER, 60), reckless).unwrap();

        assert!(result.final_collateral < 0);
        assert_eq!(result.to_liquidator, 0);
        assert_eq!(result.to_trader, 0);
        assert_eq!(result.bad_debt, result.final_collateral.unsigned_abs());
        assert_eq!(market.total_bad_debt(), result.bad_debt);
        assert_eq!(market.ledger().balance_of(reckless), before);
        assert!(market
            .events()
            .iter()
            .any(|e| matches!(e.payload, EventPayload::BadDebt(_))));
    }
}

/// Tests high position counts and rapid churn.
mod volume_tests {
    use super::*;

    #[test]
    fn many_traders_round_trip() {
        let all = traders(100);
        let (_, mut market) = setup(&all, wad(100_000));
        let total = balances(&market, &all);
        let initial = market.reserves();

        for (i, trader) in all.iter().enumerate() {
            let size = wad(100 + (i as u128 % 7) * 50) as i128;
            let size = if i % 3 == 0 { -size } else { size };
            market
                .open_or_modify(CallContext::at(*trader, i as u64), size, wad(100))
                .unwrap();
        }
        assert_eq!(market.open_positions(), 100);

        for (i, trader) in all.iter().enumerate().rev() {
            market.close(CallContext::at(*trader, 1_000 + i as u64)).unwrap();
        }

        assert_eq!(market.open_positions(), 0);
        assert_eq!(market.reserves().0, initial.0);
        // every fee was injected into the quote side
        assert!(market.reserves().1 > initial.1);
        assert_eq!(balances(&market, &all), total);
        assert_eq!(market.total_bad_debt(), 0);
    }

    #[test]
    fn rapid_flips_keep_reserves_aligned() {
        let trader = Address(0xf11b);
        let (_, mut market) = setup(&[trader], wad(1_000_000));
        let base = market.reserves().0;

        let mut size: i128 = 0;
        for step in 0..50u64 {
            let delta = if step % 2 == 0 { wad(2_000) as i128 } else { -(wad(3_000) as i128) };
            let result = market
                .open_or_modify(CallContext::at(trader, step * 10), delta, wad(500))
                .unwrap();
            size += delta;
            assert_eq!(result.new_size, size);
            assert_eq!(market.reserves().0 as i128, base as i128 - size);
        }
    }

    #[test]
    fn event_log_is_bounded() {
        let trader = Address(0x1091);
        let t0 = Timestamp::from_secs(0);
        let engine = EngineConfig {
            max_events: 16,
            ..EngineConfig::default()
        };
        let index = VarianceEngine::new(VarianceConfig::default(), engine, t0).unwrap();
        let config = MarketConfig::default();
        let mut ledger = InMemoryLedger::new(CollateralType::Dai);
        ledger.mint(trader, wad(1_000_000));
        ledger.approve(trader, config.market, u128::MAX);
        let mut market = PerpetualMarket::new(config, engine, index, ledger, t0).unwrap();

        for step in 0..40u64 {
            market
                .open_or_modify(CallContext::at(trader, step), wad(10) as i128, wad(10))
                .unwrap();
        }
        assert_eq!(market.events().len(), 16);
        assert_eq!(market.events().last().unwrap().timestamp, Timestamp::from_secs(39));
    }
}

/// Tests funding across many settlement windows.
mod funding_tests {
    use super::*;

    #[test]
    fn multi_day_funding_with_hourly_samples() {
        let long_trader = Address(0x1011);
        let short_trader = Address(0x5011);
        let (index, mut market) = setup(&[long_trader, short_trader], wad(1_000_000));
        let updater = index.borrow().config().updater;

        market
            .open_or_modify(CallContext::at(long_trader, 0), wad(20_000) as i128, wad(2_000))
            .unwrap();
        market
            .open_or_modify(CallContext::at(short_trader, 0), -(wad(5_000) as i128), wad(2_000))
            .unwrap();

        let mut settlements = 0;
        let mut last_cumulative = market.state().cumulative_funding_rate;
        for hour in 0..72u64 {
            let now = hour * 3_600;
            let wiggle = if hour % 2 == 0 { 0 } else { 40 };
            index
                .borrow_mut()
                .take_sample(CallContext::at(updater, now), wad(2_000 + wiggle))
                .unwrap();

            if market.is_funding_due(Timestamp::from_secs(now)) {
                let result = market.settle_funding(CallContext::at(KEEPER, now)).unwrap();
                assert_eq!(result.elapsed_secs, 3_600);
                // mark sits far above a 1e9-scaled index, longs keep paying
                assert!(result.funding_rate > 0);
                assert!(result.cumulative_funding_rate > last_cumulative);
                last_cumulative = result.cumulative_funding_rate;
                settlements += 1;
            }
        }

        assert_eq!(settlements, 71);
        assert_eq!(index.borrow().sample_count(), 72);
        assert!(index.borrow().annualized_volatility().unwrap() > 0);

        // funding moved value from the long to the short
        let long_funding = market.position(long_trader).unwrap().funding_pnl(last_cumulative).unwrap();
        let short_funding = market.position(short_trader).unwrap().funding_pnl(last_cumulative).unwrap();
        assert!(long_funding > 0);
        assert!(short_funding < 0);
    }

    #[test]
    fn late_settlement_covers_the_whole_gap() {
        let (_, mut market) = setup(&[], 0);
        let result = market.settle_funding(CallContext::at(KEEPER, 10 * 3_600)).unwrap();
        assert_eq!(result.elapsed_secs, 10 * 3_600);
        assert_eq!(result.next_funding_time, Timestamp::from_secs(11 * 3_600));
        assert!(matches!(
            market.settle_funding(CallContext::at(KEEPER, 10 * 3_600 + 1)),
            Err(MarketError::FundingTooEarly { .. })
        ));
    }
}
