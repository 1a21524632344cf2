//! Liquidation cascade: a forced first wave, then smaller follow-up waves while
//! each wave still knocks out enough positions.

use super::core::ManipulationEngine;
use super::results::{
    ActionPurpose, CascadeWave, EngineError, LegOutcome, StrategyDetails, StrategyKind,
    StrategyResult,
};
use crate::events::{CascadeWaveEvent, EventPayload};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const MAX_CASCADE_WAVES: u32 = 5;
// a wave must liquidate more than this many positions for the cascade to continue
pub const CASCADE_CONTINUE_THRESHOLD: usize = 5;

const FIRST_WAVE_STEPS: u32 = 5;
const FOLLOW_UP_STEPS: u32 = 3;

impl ManipulationEngine {
    /// Wave n pushes by `initial_push * 0.5^(n-1)` measured from the price the
    /// previous wave left behind.
    pub fn liquidation_cascade(&mut self, initial_push: Decimal) -> Result<StrategyResult, EngineError> {
        if initial_push <= dec!(-1) {
            return Err(EngineError::InvalidParameter {
                name: "initial_push",
                value: initial_push,
            });
        }

        let initial_price = self.current_price;
        self.strategy_started(StrategyKind::LiquidationCascade);

        let mut total = LegOutcome::default();
        let mut waves: Vec<CascadeWave> = Vec::new();
        let mut push = initial_push;
        let mut wave = 1;

        loop {
            let steps = if wave == 1 { FIRST_WAVE_STEPS } else { FOLLOW_UP_STEPS };
            let target = self
                .current_price
                .shifted(push)
                .ok_or(EngineError::InvalidParameter {
                    name: "initial_push",
                    value: initial_push,
                })?;

            let leg = self.squeeze_leg(target, steps, ActionPurpose::Cascade);
            let liquidations = leg.liquidations.len();

            tracing::debug!(wave, %push, liquidations, "cascade wave");
            self.emit_event(EventPayload::CascadeWave(CascadeWaveEvent {
                wave,
                push,
                liquidations,
            }));

            waves.push(CascadeWave {
                wave,
                push,
                target_price: target,
                liquidations,
                fry_minted: leg.fry_minted,
                collateral_absorbed: leg.collateral_absorbed,
            });
            total.absorb(leg);

            if liquidations <= CASCADE_CONTINUE_THRESHOLD || wave >= MAX_CASCADE_WAVES {
                break;
            }

            wave += 1;
            push *= dec!(0.5);
        }

        let total_liquidations = total.liquidations.len();
        let result = StrategyResult::from_leg(
            initial_price,
            self.current_price,
            total,
            StrategyDetails::LiquidationCascade {
                initial_push,
                total_waves: wave,
                total_liquidations,
                cascade_waves: waves,
            },
        );
        self.strategy_finished(&result);
        Ok(result)
    }
}
