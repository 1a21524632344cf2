//! Engine configuration options and strategy parameters.

use crate::book::Range;
use crate::config::ConfigError;
use crate::types::Leverage;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Usd size range for each manipulator action.
    pub manipulator_size_range: Range,
    /// Leverage the manipulator trades at.
    pub manipulator_leverage: Leverage,
    /// Simulated clock advance per price step.
    pub step_interval_ms: i64,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log every event through `tracing`.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            manipulator_size_range: Range::new(dec!(50_000_000), dec!(200_000_000)),
            manipulator_leverage: Leverage::new_unchecked(dec!(5)),
            step_interval_ms: 60_000,
            max_events: 100_000,
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// Leverage positivity is enforced by the type; sizes and the clock step are checked here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = &self.manipulator_size_range;
        if sizes.min <= Decimal::ZERO || !sizes.is_ordered() {
            return Err(ConfigError::Invalid {
                reason: "engine.manipulator_size_range must be positive and ordered".to_string(),
            });
        }
        if self.step_interval_ms < 0 {
            return Err(ConfigError::Invalid {
                reason: "engine.step_interval_ms cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// One strategy invocation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    DirectionalSqueeze {
        target_price: Decimal,
        #[serde(default = "default_squeeze_steps")]
        steps: u32,
    },
    VolatilityPump {
        cycles: u32,
        amplitude: Decimal,
    },
    LiquidationCascade {
        initial_push: Decimal,
    },
    CollateralDrain {
        target_drain_fraction: Decimal,
    },
}

fn default_squeeze_steps() -> u32 {
    10
}

impl Strategy {
    /// The four strategies with the parameters of the reference run.
    pub fn default_suite() -> Vec<Strategy> {
        vec![
            Strategy::DirectionalSqueeze {
                target_price: dec!(35000),
                steps: default_squeeze_steps(),
            },
            Strategy::VolatilityPump {
                cycles: 3,
                amplitude: dec!(0.12),
            },
            Strategy::LiquidationCascade {
                initial_push: dec!(0.25),
            },
            Strategy::CollateralDrain {
                target_drain_fraction: dec!(0.75),
            },
        ]
    }
}
