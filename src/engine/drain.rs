//! Collateral drain: repeatedly aim at whichever side of the opted-in book
//! holds more collateral until a target share of it has been absorbed.

use super::core::ManipulationEngine;
use super::results::{
    ActionPurpose, DrainPhase, EngineError, LegOutcome, StrategyDetails, StrategyKind,
    StrategyResult,
};
use crate::events::{DrainPhaseEvent, EventPayload};
use crate::position::RetailPosition;
use crate::types::{Price, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const MAX_DRAIN_PHASES: u32 = 10;
const PHASE_STEPS: u32 = 5;

impl ManipulationEngine {
    /// Stops once `target_drain_fraction` of the opted-in collateral present at
    /// the start has been absorbed, the opted-in book is empty, or after
    /// `MAX_DRAIN_PHASES` phases.
    pub fn collateral_drain(
        &mut self,
        target_drain_fraction: Decimal,
    ) -> Result<StrategyResult, EngineError> {
        if target_drain_fraction < Decimal::ZERO {
            return Err(EngineError::InvalidParameter {
                name: "target_drain_fraction",
                value: target_drain_fraction,
            });
        }

        let initial_price = self.current_price;
        self.strategy_started(StrategyKind::CollateralDrain);

        let total_opt_in_collateral = self.book.opt_in_collateral(&self.asset);
        let target_drain_amount = total_opt_in_collateral.mul(target_drain_fraction);
        tracing::info!(
            %total_opt_in_collateral,
            %target_drain_amount,
            "drain target computed"
        );

        let mut total = LegOutcome::default();
        let mut phases: Vec<DrainPhase> = Vec::new();
        let mut drained = Quote::zero();
        let mut phase = 1;

        while drained < target_drain_amount && phase <= MAX_DRAIN_PHASES {
            let Some(target_price) = self.richest_side_target() else {
                break;
            };

            let leg = self.squeeze_leg(target_price, PHASE_STEPS, ActionPurpose::Drain);
            let phase_drain: Quote = leg.liquidations.iter().map(|l| l.collateral_absorbed).sum();
            drained = drained.add(phase_drain);

            self.emit_event(EventPayload::DrainPhase(DrainPhaseEvent {
                phase,
                target_price,
                drained: phase_drain,
                drained_so_far: drained,
                target_drain_amount,
            }));

            phases.push(DrainPhase {
                phase,
                target_price,
                liquidations: leg.liquidations.len(),
                collateral_drained: phase_drain,
                fry_minted: leg.fry_minted,
            });
            total.absorb(leg);
            phase += 1;
        }

        let drain_efficiency = if target_drain_amount.is_positive() {
            drained.value() / target_drain_amount.value()
        } else {
            Decimal::ZERO
        };

        let result = StrategyResult::from_leg(
            initial_price,
            self.current_price,
            total,
            StrategyDetails::CollateralDrain {
                target_drain_fraction,
                target_drain_amount,
                total_drained: drained,
                drain_efficiency,
                phases,
            },
        );
        self.strategy_finished(&result);
        Ok(result)
    }

    // 6.6: lowest long liquidation price if longs hold more collateral, else highest short one.
    // None once no opted-in positions of the asset are left.
    fn richest_side_target(&self) -> Option<Price> {
        let (longs, shorts): (Vec<&RetailPosition>, Vec<&RetailPosition>) =
            self.book.opted_in(&self.asset).partition(|p| p.is_long());

        if longs.is_empty() && shorts.is_empty() {
            return None;
        }

        let long_collateral: Quote = longs.iter().map(|p| p.collateral_locked).sum();
        let short_collateral: Quote = shorts.iter().map(|p| p.collateral_locked).sum();

        if long_collateral > short_collateral {
            longs
                .iter()
                .map(|p| p.liquidation_price)
                .min()
                .or_else(|| self.current_price.shifted(dec!(-0.1)))
        } else {
            shorts
                .iter()
                .map(|p| p.liquidation_price)
                .max()
                .or_else(|| self.current_price.shifted(dec!(0.1)))
        }
    }
}
