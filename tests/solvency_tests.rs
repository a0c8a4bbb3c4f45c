//! Solvency invariant tests.
//!
//! These tests verify the invariants that keep the market's real collateral
//! consistent with its virtual bookkeeping under any sequence of calls.

use proptest::prelude::*;
use volperp_core::*;

const KEEPER: Address = Address(0xcee9);

fn trader(i: usize) -> Address {
    Address(0x1000 + i as u64)
}

fn market(traders: usize) -> PerpetualMarket<VarianceEngine, InMemoryLedger> {
    let t0 = Timestamp::from_secs(0);
    let index = VarianceEngine::new(VarianceConfig::default(), EngineConfig::default(), t0).unwrap();
    let config = MarketConfig::default();
    let mut ledger = InMemoryLedger::new(CollateralType::Dai);
    for i in 0..traders {
        ledger.mint(trader(i), wad(100_000));
        ledger.approve(trader(i), config.market, u128::MAX);
    }
    PerpetualMarket::new(config, EngineConfig::default(), index, ledger, t0).unwrap()
}

fn total_collateral(market: &PerpetualMarket<VarianceEngine, InMemoryLedger>, traders: usize) -> u128 {
    let mut total = market.ledger().balance_of(market.config().market) + market.ledger().balance_of(KEEPER);
    for i in 0..traders {
        total += market.ledger().balance_of(trader(i));
    }
    total
}

#[derive(Debug, Clone)]
enum Action {
    Trade { who: usize, size: i64, margin: u64 },
    Close { who: usize },
    Liquidate { who: usize },
    Funding,
}

fn action_strategy(traders: usize) -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0..traders, -5_000i64..5_000, 50u64..2_000)
            .prop_map(|(who, size, margin)| Action::Trade { who, size, margin }),
        2 => (0..traders).prop_map(|who| Action::Close { who }),
        1 => (0..traders).prop_map(|who| Action::Liquidate { who }),
        1 => Just(Action::Funding),
    ]
}

fn apply(market: &mut PerpetualMarket<VarianceEngine, InMemoryLedger>, action: &Action, now: u64) -> Result<(), MarketError> {
    match *action {
        Action::Trade { who, size, margin } => {
            let delta = i128::from(size) * wad(1) as i128;
            market
                .open_or_modify(CallContext::at(trader(who), now), delta, wad(u128::from(margin)))
                .map(|_| ())
        }
        Action::Close { who } => market.close(CallContext::at(trader(who), now)).map(|_| ()),
        Action::Liquidate { who } => market.liquidate(CallContext::at(KEEPER, now), trader(who)).map(|_| ()),
        Action::Funding => market.settle_funding(CallContext::at(KEEPER, now)).map(|_| ()),
    }
}

proptest! {
    /// Collateral is only ever moved, never created or destroyed
    #[test]
    fn collateral_is_conserved(
        actions in proptest::collection::vec(action_strategy(4), 1..40),
    ) {
        let mut market = market(4);
        let initial = total_collateral(&market, 4);

        for (step, action) in actions.iter().enumerate() {
            let _ = apply(&mut market, action, step as u64 * 900);
            prop_assert_eq!(total_collateral(&market, 4), initial);
        }
    }

    /// Any failed call leaves state, positions and balances untouched
    #[test]
    fn failures_are_atomic(
        actions in proptest::collection::vec(action_strategy(4), 1..40),
    ) {
        let mut market = market(4);

        for (step, action) in actions.iter().enumerate() {
            let state = market.state();
            let positions = market.positions().clone();
            let market_balance = market.ledger().balance_of(market.config().market);
            let events = market.events().len();

            if apply(&mut market, action, step as u64 * 900).is_err() {
                prop_assert_eq!(market.state(), state);
                prop_assert_eq!(market.positions(), &positions);
                prop_assert_eq!(market.ledger().balance_of(market.config().market), market_balance);
                prop_assert_eq!(market.events().len(), events);
            }
        }
    }

    /// The base reserve only tracks open interest: net size of all positions
    #[test]
    fn base_reserve_tracks_net_size(
        actions in proptest::collection::vec(action_strategy(6), 1..40),
    ) {
        let mut market = market(6);
        let initial_base = market.config().base_reserve as i128;

        for (step, action) in actions.iter().enumerate() {
            let _ = apply(&mut market, action, step as u64 * 900);
            let net: i128 = market.positions().values().map(|p| p.size).sum();
            prop_assert_eq!(market.reserves().0 as i128, initial_base - net);
        }
    }

    /// Funding accrues only on schedule
    #[test]
    fn funding_never_settles_early(offsets in proptest::collection::vec(0u64..3_600, 1..10)) {
        let mut market = market(1);
        for offset in offsets {
            let before = market.state().cumulative_funding_rate;
            let next = market.next_funding_time();
            let early = next.as_secs().saturating_sub(3_600) + offset;
            if early < next.as_secs() {
                let result = market.settle_funding(CallContext::at(KEEPER, early));
                prop_assert!(
                    matches!(result, Err(MarketError::FundingTooEarly { .. })),
                    "expected FundingTooEarly"
                );
                prop_assert_eq!(market.state().cumulative_funding_rate, before);
            }
            market.settle_funding(CallContext::at(KEEPER, next.as_secs())).unwrap();
        }
    }
}

#[test]
fn every_position_can_exit_when_pool_is_solvent() {
    let traders = 6;
    let mut market = market(traders);
    for i in 0..traders {
        let size: i128 = if i % 2 == 0 { 2_000 } else { -1_500 };
        market
            .open_or_modify(CallContext::at(trader(i), 0), size * wad(1) as i128, wad(500))
            .unwrap();
    }

    for i in (0..traders).rev() {
        market.close(CallContext::at(trader(i), 60)).unwrap();
    }

    assert_eq!(market.open_positions(), 0);
    assert_eq!(market.reserves().0, market.config().base_reserve);
    // all fees stay with the market
    assert!(market.ledger().balance_of(market.config().market) > 0);
    assert_eq!(market.total_bad_debt(), 0);
}
