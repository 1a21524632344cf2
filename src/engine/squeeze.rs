//! Directional squeeze: walk the reference price to a target in equal steps.
//!
//! Every other strategy is built out of squeeze legs.

use super::core::ManipulationEngine;
use super::results::{ActionPurpose, LegOutcome, StrategyDetails, StrategyKind, StrategyResult};
use crate::events::{EventPayload, PriceStepEvent};
use crate::types::{Price, Side};
use rust_decimal::Decimal;
use std::cmp::Ordering;

impl ManipulationEngine {
    /// Move the price linearly to `target` over `steps` increments, sweeping
    /// every opted-in position liquidated along the way. The last step lands
    /// on `target` exactly. Zero steps is treated as one.
    pub fn directional_squeeze(&mut self, target: Price, steps: u32) -> StrategyResult {
        let initial_price = self.current_price;
        self.strategy_started(StrategyKind::DirectionalSqueeze);

        let leg = self.squeeze_leg(target, steps, ActionPurpose::Squeeze);

        let final_price = self.current_price;
        let price_impact = (final_price.value() - initial_price.value()) / initial_price.value();

        let result = StrategyResult::from_leg(
            initial_price,
            final_price,
            leg,
            StrategyDetails::DirectionalSqueeze {
                target_price: target,
                steps: steps.max(1),
                price_impact,
            },
        );
        self.strategy_finished(&result);
        result
    }

    pub(super) fn squeeze_leg(&mut self, target: Price, steps: u32, purpose: ActionPurpose) -> LegOutcome {
        let steps = steps.max(1);
        let start = self.current_price;
        let increment = (target.value() - start.value()) / Decimal::from(steps);
        // a flat leg needs no capital to hold the price, so no manipulator is deployed
        let side = match target.cmp(&start) {
            Ordering::Greater => Some(Side::Long),
            Ordering::Less => Some(Side::Short),
            Ordering::Equal => None,
        };

        let mut leg = LegOutcome::default();

        for step in 1..=steps {
            // interpolate from the start instead of accumulating, so rounding can't drift
            let price = if step == steps {
                target
            } else {
                Price::new(start.value() + increment * Decimal::from(step)).unwrap_or(target)
            };
            self.move_price(price);

            if let Some(side) = side {
                let cost = self.deploy_manipulator(side, purpose);
                leg.manipulation_cost = leg.manipulation_cost.add(cost);
            }

            let liquidated = self.book.liquidate_all(price, &self.asset);
            let minted_before = leg.fry_minted;
            let mut swept = 0;

            for position in liquidated.iter().filter(|p| p.opt_in) {
                self.sweep_liquidation(position, &mut leg);
                swept += 1;
            }

            self.emit_event(EventPayload::PriceStep(PriceStepEvent {
                step,
                total_steps: steps,
                price,
                liquidated: liquidated.len(),
                swept,
                fry_minted: leg.fry_minted - minted_before,
            }));
        }

        leg
    }
}
