//! Volatility Perpetual Simulation.
//!
//! Demonstrates the full lifecycle: index sampling, vAMM trading, funding
//! against the volatility index, liquidations and ledger failure rollback.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;
use volperp_core::math::{from_native, to_decimal, to_decimal_unsigned};
use volperp_core::*;

type SharedIndex = Rc<RefCell<VarianceEngine>>;

const USDC: u128 = 1_000_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    println!("Volatility Perpetual Simulation");
    println!("Single Index, Single vAMM Market, Full Lifecycle\n");

    scenario_1_index_sampling();
    scenario_2_round_trip();
    scenario_3_funding_settlement();
    scenario_4_liquidation_cascade();
    scenario_5_transfer_failure();
    scenario_6_stress_test();

    println!("\nAll simulations completed successfully.");
}

fn setup(config: &ProtocolConfig, traders: &[(Address, u128)]) -> (SharedIndex, PerpetualMarket<SharedIndex, InMemoryLedger>) {
    config.validate().unwrap();
    let t0 = Timestamp::from_secs(0);
    let index = Rc::new(RefCell::new(
        VarianceEngine::new(config.variance.clone(), config.engine, t0).unwrap(),
    ));

    let mut ledger = InMemoryLedger::new(config.collateral);
    for (trader, usdc) in traders {
        ledger.mint(*trader, usdc * USDC);
        ledger.approve(*trader, config.market.market, u128::MAX);
    }

    let market = PerpetualMarket::new(config.market.clone(), config.engine, index.clone(), ledger, t0).unwrap();
    (index, market)
}

fn usdc_balance(market: &PerpetualMarket<SharedIndex, InMemoryLedger>, who: Address) -> rust_decimal::Decimal {
    let native = market.ledger().balance_of(who);
    to_decimal_unsigned(from_native(native, market.ledger().decimals()).unwrap())
}

/// EWMA variance from an hourly price series.
fn scenario_1_index_sampling() {
    println!("Scenario 1: Index Sampling\n");

    let config = ProtocolConfig::default();
    let updater = config.variance.updater;
    let mut engine = VarianceEngine::new(config.variance.clone(), config.engine, Timestamp::from_secs(0)).unwrap();

    println!("  lambda 0.94, initial variance 0.04, hourly samples");

    let prices = [2_000u128, 2_100, 2_050, 2_300, 2_250, 2_260];
    for (hour, price) in prices.iter().enumerate() {
        let ctx = CallContext::at(updater, hour as u64 * 3_600);
        match engine.take_sample(ctx, wad(*price)).unwrap() {
            SampleOutcome::Seeded { .. } => println!("  h{}: seeded at ${}", hour, price),
            SampleOutcome::Updated {
                return_proxy,
                new_variance,
                ..
            } => println!(
                "  h{}: ${} proxy {} variance {}",
                hour,
                price,
                to_decimal_unsigned(return_proxy),
                to_decimal_unsigned(new_variance)
            ),
        }
    }

    let stranger = CallContext::at(Address(0xbad), 20_000);
    let rejected = engine.take_sample(stranger, wad(9_999)).unwrap_err();
    println!("  Stranger sample rejected: {}", rejected);
    println!(
        "  Annualized volatility (1e9 scale): {}, samples: {}\n",
        engine.annualized_volatility().unwrap(),
        engine.sample_count()
    );
}

/// Open then close immediately: the only cost is the two fees.
fn scenario_2_round_trip() {
    println!("Scenario 2: Open and Close\n");

    let alice = Address(0xa11ce);
    let (_, mut market) = setup(&ProtocolConfig::default(), &[(alice, 10_000)]);

    let open = market
        .open_or_modify(CallContext::at(alice, 0), wad(1_000) as i128, wad(100))
        .unwrap();
    println!(
        "  Alice longs 1000 @ {} (fee {}), mark now {}",
        to_decimal_unsigned(open.average_price),
        to_decimal_unsigned(open.fee),
        to_decimal_unsigned(open.mark_price)
    );

    let close = market.close(CallContext::at(alice, 0)).unwrap();
    println!(
        "  Alice closes @ {}, pnl {}, payout {}",
        to_decimal_unsigned(close.exit_price),
        to_decimal(close.net_pnl),
        to_decimal_unsigned(close.payout)
    );
    println!("  Alice balance: ${}\n", usdc_balance(&market, alice));
}

/// Funding pulls the mark toward the index.
fn scenario_3_funding_settlement() {
    println!("Scenario 3: Funding Settlement\n");

    let config = ProtocolConfig::default();
    let updater = config.variance.updater;
    let long_trader = Address(0x1011);
    let short_trader = Address(0x5011);
    let keeper = Address(0xcee9);
    let (index, mut market) = setup(&config, &[(long_trader, 10_000), (short_trader, 10_000)]);

    market
        .open_or_modify(CallContext::at(long_trader, 0), wad(5_000) as i128, wad(500))
        .unwrap();
    market
        .open_or_modify(CallContext::at(short_trader, 0), -(wad(2_000) as i128), wad(500))
        .unwrap();

    for hour in 0..=1u64 {
        let price = if hour == 0 { 2_000 } else { 2_200 };
        index
            .borrow_mut()
            .take_sample(CallContext::at(updater, hour * 3_600), wad(price))
            .unwrap();
    }

    let too_early = market.settle_funding(CallContext::at(keeper, 1_800));
    println!("  Settle at 30 min: {:?}", too_early.err());

    let long_before = market.unrealized_pnl(long_trader).unwrap();
    let result = market.settle_funding(CallContext::at(keeper, 3_600)).unwrap();
    let long_after = market.unrealized_pnl(long_trader).unwrap();

    println!(
        "  Mark TWAP {}, index TWAP {}",
        to_decimal_unsigned(result.mark_twap),
        result.index_twap
    );
    println!("  Funding rate {}", to_decimal(result.funding_rate));
    println!(
        "  Long pnl {} -> {}, next settlement at {}\n",
        to_decimal(long_before),
        to_decimal(long_after),
        result.next_funding_time
    );
}

/// A large short pushes leveraged longs under maintenance.
fn scenario_4_liquidation_cascade() {
    println!("Scenario 4: Liquidation Cascade\n");

    let conservative = Address(0xc0);
    let moderate = Address(0xc1);
    let aggressive = Address(0xc2);
    let whale = Address(0x3a1e);
    let keeper = Address(0xcee9);
    let (_, mut market) = setup(
        &ProtocolConfig::default(),
        &[(conservative, 10_000), (moderate, 10_000), (aggressive, 10_000), (whale, 1_000_000)],
    );

    for (trader, margin) in [(conservative, 1_000u128), (moderate, 500), (aggressive, 230)] {
        market
            .open_or_modify(CallContext::at(trader, 0), wad(10_000) as i128, wad(margin))
            .unwrap();
    }
    println!("  Three longs of 10000 opened, mark {}", to_decimal_unsigned(market.mark_price().unwrap()));

    for (step, dump) in [20_000u128, 40_000, 80_000].iter().enumerate() {
        let at = (step as u64 + 1) * 60;
        market
            .open_or_modify(CallContext::at(whale, at), -(wad(*dump) as i128), wad(*dump / 2))
            .unwrap();

        let mut liquidated = Vec::new();
        for (name, trader) in [("conservative", conservative), ("moderate", moderate), ("aggressive", aggressive)] {
            if market.is_liquidatable(trader).unwrap() {
                let liq = market.liquidate(CallContext::at(keeper, at), trader).unwrap();
                liquidated.push(format!("{} (bad debt {})", name, to_decimal_unsigned(liq.bad_debt)));
            }
        }

        let mark = to_decimal_unsigned(market.mark_price().unwrap());
        if liquidated.is_empty() {
            println!("  Whale sells {}: mark {}, no liquidations", dump, mark);
        } else {
            println!("  Whale sells {}: mark {}, liquidated {}", dump, mark, liquidated.join(", "));
        }
    }

    println!("  Keeper earned ${}", usdc_balance(&market, keeper));
    println!("  Protocol bad debt: {}\n", to_decimal_unsigned(market.total_bad_debt()));
}

/// A failing ledger leaves the market untouched.
fn scenario_5_transfer_failure() {
    println!("Scenario 5: Ledger Failure Rollback\n");

    let alice = Address(0xa11ce);
    let (_, mut market) = setup(&ProtocolConfig::default(), &[(alice, 10_000)]);
    let before = market.state();

    market.ledger_mut().set_fail_all(true);
    let result = market.open_or_modify(CallContext::at(alice, 600), wad(1_000) as i128, wad(100));
    println!("  Open with a failing ledger: {:?}", result.err());
    println!("  State unchanged: {}", market.state() == before);

    market.ledger_mut().set_fail_all(false);
    market
        .open_or_modify(CallContext::at(alice, 600), wad(1_000) as i128, wad(100))
        .unwrap();
    println!("  Retry succeeded, {} event(s)\n", market.events().len());
}

/// Many traders, alternating sides, funding every hour.
fn scenario_6_stress_test() {
    println!("Scenario 6: Stress Test\n");

    let config = ProtocolConfig::default();
    let updater = config.variance.updater;
    let keeper = Address(0xcee9);
    let traders: Vec<(Address, u128)> = (1..=20u64).map(|i| (Address(0x1000 + i), 50_000)).collect();
    let (index, mut market) = setup(&config, &traders);

    let mut opened = 0;
    for (i, (trader, _)) in traders.iter().enumerate() {
        let size = wad(500 + (i as u128 % 5) * 250) as i128;
        let size = if i % 2 == 0 { size } else { -size };
        if market
            .open_or_modify(CallContext::at(*trader, 0), size, wad(200))
            .is_ok()
        {
            opened += 1;
        }
    }
    println!("  {} traders, {} positions opened", traders.len(), opened);

    let prices = [2_000u128, 2_040, 1_980, 2_150, 2_090, 2_300, 2_210, 2_120];
    let mut liquidations = 0;
    for (hour, price) in prices.iter().enumerate() {
        let now = hour as u64 * 3_600;
        index
            .borrow_mut()
            .take_sample(CallContext::at(updater, now), wad(*price))
            .unwrap();
        if market.is_funding_due(Timestamp::from_secs(now)) {
            market.settle_funding(CallContext::at(keeper, now)).unwrap();
        }
        for (trader, _) in &traders {
            if market.is_liquidatable(*trader).unwrap() {
                market.liquidate(CallContext::at(keeper, now), *trader).unwrap();
                liquidations += 1;
            }
        }
    }

    let threshold = dec!(0.5);
    let vol = index.borrow().annualized_volatility().unwrap();
    println!("  Index volatility after {} hours: {} (1e9 scale)", prices.len(), vol);
    println!(
        "  Cumulative funding {} (above {}: {})",
        to_decimal(market.state().cumulative_funding_rate),
        threshold,
        to_decimal(market.state().cumulative_funding_rate) > threshold
    );
    println!("  Liquidations: {}, open positions: {}", liquidations, market.open_positions());
    println!("  Events generated: {}\n", market.events().len());
}
