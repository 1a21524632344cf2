//! Volatility pump: swing the price around a fixed base to hit both sides.

use super::core::ManipulationEngine;
use super::results::{
    ActionPurpose, EngineError, LegOutcome, StrategyDetails, StrategyKind, StrategyResult,
};
use crate::events::{EventPayload, PumpCycleEvent};
use rust_decimal::Decimal;

const PUMP_STEPS: u32 = 3;
const DUMP_STEPS: u32 = 3;
const RETURN_STEPS: u32 = 2;

impl ManipulationEngine {
    /// Each cycle pumps to `base * (1 + amplitude)`, dumps to
    /// `base * (1 - amplitude)` and returns to `base`. The base is the price
    /// at entry and stays fixed for every cycle.
    pub fn volatility_pump(
        &mut self,
        cycles: u32,
        amplitude: Decimal,
    ) -> Result<StrategyResult, EngineError> {
        let invalid = EngineError::InvalidParameter {
            name: "amplitude",
            value: amplitude,
        };
        if amplitude < Decimal::ZERO {
            return Err(invalid);
        }

        let base = self.current_price;
        let pump_target = base.shifted(amplitude).ok_or_else(|| invalid.clone())?;
        let dump_target = base.shifted(-amplitude).ok_or(invalid)?;

        self.strategy_started(StrategyKind::VolatilityPump);

        let mut total = LegOutcome::default();

        for cycle in 1..=cycles {
            total.absorb(self.squeeze_leg(pump_target, PUMP_STEPS, ActionPurpose::Pump));
            total.absorb(self.squeeze_leg(dump_target, DUMP_STEPS, ActionPurpose::Dump));
            total.absorb(self.squeeze_leg(base, RETURN_STEPS, ActionPurpose::Return));

            tracing::debug!(cycle, cycles, fry_minted = %total.fry_minted, "pump cycle complete");
            self.emit_event(EventPayload::PumpCycleCompleted(PumpCycleEvent {
                cycle,
                total_cycles: cycles,
                fry_minted: total.fry_minted,
            }));
        }

        let result = StrategyResult::from_leg(
            base,
            self.current_price,
            total,
            StrategyDetails::VolatilityPump { cycles, amplitude },
        );
        self.strategy_finished(&result);
        Ok(result)
    }
}
