//! Property-based tests for the sweep math and strategy termination.
//!
//! These tests verify invariants hold under random inputs.

use manipulation_sim::engine::{
    EngineConfig, ManipulationEngine, StrategyDetails, MAX_CASCADE_WAVES, MAX_DRAIN_PHASES,
};
use manipulation_sim::events::EventPayload;
use manipulation_sim::ledger::{calculate_multiplier, CollateralSweepLedger, SweepRequest, MAX_MULTIPLIER, MIN_MULTIPLIER};
use manipulation_sim::roi::calculate_roi;
use manipulation_sim::{
    Asset, GenerationParams, Leverage, PositionBook, Price, Quote, Timestamp, TraderId,
    USD_DECIMAL_PLACES,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

// Strategies for generating test data
fn usd_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $100,000
}

fn leverage_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=1000i64).prop_map(|x| Decimal::new(x, 1)) // 0.1x to 100x
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (100_000i64..10_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $1,000 to $100,000
}

fn btc() -> Asset {
    Asset::from("BTC")
}

fn engine(seed: u64, count: usize) -> ManipulationEngine {
    let mut engine = ManipulationEngine::new(
        EngineConfig::default(),
        btc(),
        Price::new_unchecked(dec!(45000)),
        seed,
    );
    engine.populate(count, &GenerationParams::default(), dec!(0.75));
    engine
}

proptest! {
    /// Multiplier is always within [1, 50] and minting is exact
    #[test]
    fn multiplier_bounded_and_mint_exact(
        leverage in leverage_strategy(),
        size in usd_strategy(),
        loss in usd_strategy(),
        liquidation in any::<bool>(),
    ) {
        let lev = Leverage::new(leverage).unwrap();
        let b = calculate_multiplier(lev, Quote::new(size), Quote::new(loss), liquidation);
        prop_assert!(b.multiplier >= MIN_MULTIPLIER);
        prop_assert!(b.multiplier <= MAX_MULTIPLIER);

        let asset = btc();
        let mut ledger = CollateralSweepLedger::default();
        let receipt = ledger.sweep(SweepRequest {
            trader_id: TraderId(1),
            loss_amount: Quote::new(loss),
            asset: &asset,
            leverage: lev,
            position_size: Quote::new(size),
            liquidation,
            timestamp: Timestamp::from_millis(0),
        });
        prop_assert_eq!(receipt.minted, loss * receipt.multiplier);
        prop_assert_eq!(receipt.multiplier, b.multiplier);
    }

    /// Ledger totals always equal the sum over its records
    #[test]
    fn ledger_totals_consistent(
        losses in prop::collection::vec((usd_strategy(), usd_strategy(), leverage_strategy()), 0..40),
    ) {
        let asset = btc();
        let mut ledger = CollateralSweepLedger::new([7u8; 32]);
        for (i, (loss, size, lev)) in losses.iter().enumerate() {
            ledger.sweep(SweepRequest {
                trader_id: TraderId(i as u64),
                loss_amount: Quote::new(*loss),
                asset: &asset,
                leverage: Leverage::new(*lev).unwrap(),
                position_size: Quote::new(*size),
                liquidation: i % 2 == 0,
                timestamp: Timestamp::from_millis(i as i64),
            });
        }

        let minted: Decimal = ledger.records().iter().map(|r| r.fry_minted).sum();
        let swept: Quote = ledger.records().iter().map(|r| r.loss_amount).sum();
        let totals = ledger.get_totals();
        prop_assert_eq!(totals.total_fry_minted, minted);
        prop_assert_eq!(totals.total_collateral_swept, swept);
        prop_assert_eq!(totals.losses_in_pool, losses.len());
    }

    /// Every generated position locks size / leverage at fixed usd precision
    #[test]
    fn generated_collateral_is_size_over_leverage(seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut book = PositionBook::new();
        let prices = HashMap::from([(btc(), Price::new_unchecked(dec!(45000)))]);
        book.generate(50, &prices, dec!(0.5), &GenerationParams::default(), &mut rng);

        for p in book.positions() {
            let expected = (p.size.value() / p.leverage.value()).round_dp(USD_DECIMAL_PLACES);
            prop_assert_eq!(p.collateral_locked.value(), expected);
            prop_assert!(p.collateral_locked.value().scale() <= USD_DECIMAL_PLACES);
        }
    }

    /// A liquidated position never comes back from a later liquidation pass
    #[test]
    fn liquidation_is_one_shot(
        seed in any::<u64>(),
        first in price_strategy(),
        second in price_strategy(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut book = PositionBook::new();
        let prices = HashMap::from([(btc(), Price::new_unchecked(dec!(45000)))]);
        book.generate(100, &prices, dec!(1), &GenerationParams::default(), &mut rng);

        let gone = book.liquidate_all(Price::new_unchecked(first), &btc());
        let again = book.liquidate_all(Price::new_unchecked(second), &btc());

        for p in &gone {
            prop_assert!(book.get(p.trader_id).is_none());
            prop_assert!(again.iter().all(|q| q.trader_id != p.trader_id));
        }
    }

    /// Zero deployed capital never divides
    #[test]
    fn roi_zero_cost_is_zero(minted in usd_strategy(), absorbed in usd_strategy()) {
        let report = calculate_roi(minted, Quote::new(absorbed), Quote::zero(), dec!(0.10));
        prop_assert_eq!(report.roi_fraction, Decimal::ZERO);
        prop_assert_eq!(report.roi_percentage, Decimal::ZERO);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A squeeze ends exactly on its target for any step count
    #[test]
    fn squeeze_lands_on_target(
        seed in any::<u64>(),
        target in price_strategy(),
        steps in 0u32..25,
    ) {
        let mut e = engine(seed, 100);
        let target = Price::new_unchecked(target);
        let result = e.directional_squeeze(target, steps);
        prop_assert_eq!(result.final_price, target);
        prop_assert_eq!(e.current_price(), target);
    }

    /// Cascades stop within five waves, each wave measured from the current price
    #[test]
    fn cascade_terminates(
        seed in any::<u64>(),
        push in (-90i64..=300i64).prop_map(|x| Decimal::new(x, 2)),
    ) {
        let mut e = engine(seed, 300);
        let result = e.liquidation_cascade(push).unwrap();

        let waves = match &result.details {
            StrategyDetails::LiquidationCascade { cascade_waves, .. } => cascade_waves.clone(),
            other => panic!("unexpected details {other:?}"),
        };
        prop_assert!(!waves.is_empty());
        prop_assert!(waves.len() as u32 <= MAX_CASCADE_WAVES);

        let mut price = dec!(45000);
        for w in &waves {
            price *= Decimal::ONE + w.push;
            prop_assert_eq!(w.target_price.value(), price);
        }
    }

    /// Drained collateral only grows and the loop halts within ten phases
    #[test]
    fn drain_monotonic_and_bounded(
        seed in any::<u64>(),
        fraction in (0i64..=100i64).prop_map(|x| Decimal::new(x, 2)),
    ) {
        let mut e = engine(seed, 200);
        let result = e.collateral_drain(fraction).unwrap();

        let phases = match &result.details {
            StrategyDetails::CollateralDrain { phases, .. } => phases.len(),
            other => panic!("unexpected details {other:?}"),
        };
        prop_assert!(phases as u32 <= MAX_DRAIN_PHASES);

        let mut last = Quote::zero();
        for event in e.events() {
            if let EventPayload::DrainPhase(d) = &event.payload {
                prop_assert!(d.drained_so_far >= last);
                last = d.drained_so_far;
            }
        }
    }
}
