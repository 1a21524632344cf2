// 6.0.2: result types and errors for strategy runs.

use crate::types::{Leverage, LossId, Price, Quote, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectionalSqueeze,
    VolatilityPump,
    LiquidationCascade,
    CollateralDrain,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DirectionalSqueeze => "directional_squeeze",
            StrategyKind::VolatilityPump => "volatility_pump",
            StrategyKind::LiquidationCascade => "liquidation_cascade",
            StrategyKind::CollateralDrain => "collateral_drain",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StrategyKind::DirectionalSqueeze => "Directional Squeeze",
            StrategyKind::VolatilityPump => "Volatility Pump",
            StrategyKind::LiquidationCascade => "Liquidation Cascade",
            StrategyKind::CollateralDrain => "Collateral Drain",
        }
    }
}

// why the manipulator opened a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPurpose {
    Squeeze,
    Pump,
    Dump,
    Return,
    Cascade,
    Drain,
}

/// Large synthetic position used to justify a price move. Never liquidated,
/// only counted as deployed capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulatorAction {
    pub size: Quote,
    pub leverage: Leverage,
    pub entry_price: Price,
    pub side: Side,
    pub purpose: ActionPurpose,
}

impl ManipulatorAction {
    pub fn capital_deployed(&self) -> Quote {
        self.leverage.collateral_for(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationRecord {
    pub record_id: LossId,
    pub trader_ref: String,
    pub loss_usd: Quote,
    pub fry_minted: Decimal,
    pub collateral_absorbed: Quote,
    pub leverage: Leverage,
    pub price_at_liquidation: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeWave {
    pub wave: u32,
    pub push: Decimal,
    pub target_price: Price,
    pub liquidations: usize,
    pub fry_minted: Decimal,
    pub collateral_absorbed: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainPhase {
    pub phase: u32,
    pub target_price: Price,
    pub liquidations: usize,
    pub collateral_drained: Quote,
    pub fry_minted: Decimal,
}

/// Strategy specific fields. The tag doubles as the `strategy` field of the
/// flattened result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyDetails {
    DirectionalSqueeze {
        target_price: Price,
        steps: u32,
        price_impact: Decimal,
    },
    VolatilityPump {
        cycles: u32,
        amplitude: Decimal,
    },
    LiquidationCascade {
        initial_push: Decimal,
        total_waves: u32,
        total_liquidations: usize,
        cascade_waves: Vec<CascadeWave>,
    },
    CollateralDrain {
        target_drain_fraction: Decimal,
        target_drain_amount: Quote,
        total_drained: Quote,
        drain_efficiency: Decimal,
        phases: Vec<DrainPhase>,
    },
}

impl StrategyDetails {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyDetails::DirectionalSqueeze { .. } => StrategyKind::DirectionalSqueeze,
            StrategyDetails::VolatilityPump { .. } => StrategyKind::VolatilityPump,
            StrategyDetails::LiquidationCascade { .. } => StrategyKind::LiquidationCascade,
            StrategyDetails::CollateralDrain { .. } => StrategyKind::CollateralDrain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub initial_price: Price,
    pub final_price: Price,
    pub liquidations: Vec<LiquidationRecord>,
    pub fry_minted: Decimal,
    pub collateral_absorbed: Quote,
    pub manipulation_cost: Quote,
    #[serde(flatten)]
    pub details: StrategyDetails,
}

impl StrategyResult {
    pub(super) fn from_leg(
        initial_price: Price,
        final_price: Price,
        leg: LegOutcome,
        details: StrategyDetails,
    ) -> Self {
        Self {
            initial_price,
            final_price,
            liquidations: leg.liquidations,
            fry_minted: leg.fry_minted,
            collateral_absorbed: leg.collateral_absorbed,
            manipulation_cost: leg.manipulation_cost,
            details,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.details.kind()
    }
}

// 6.0.3: accumulator for one or more squeeze legs
#[derive(Debug, Clone, Default)]
pub(super) struct LegOutcome {
    pub liquidations: Vec<LiquidationRecord>,
    pub fry_minted: Decimal,
    pub collateral_absorbed: Quote,
    pub manipulation_cost: Quote,
}

impl LegOutcome {
    pub fn absorb(&mut self, other: LegOutcome) {
        self.liquidations.extend(other.liquidations);
        self.fry_minted += other.fry_minted;
        self.collateral_absorbed = self.collateral_absorbed.add(other.collateral_absorbed);
        self.manipulation_cost = self.manipulation_cost.add(other.manipulation_cost);
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid strategy parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: Decimal },
}
