// 6.0: manipulation engine. owns the reference price, the position book and the ledger,
// and drives them through the four price-path strategies.
// deterministic given a seed, single threaded, no external I/O.

mod cascade;
mod config;
mod core;
mod drain;
mod pump;
mod results;
mod squeeze;

pub use cascade::{CASCADE_CONTINUE_THRESHOLD, MAX_CASCADE_WAVES};
pub use config::{EngineConfig, Strategy};
pub use core::ManipulationEngine;
pub use drain::MAX_DRAIN_PHASES;
pub use results::{
    ActionPurpose, CascadeWave, DrainPhase, EngineError, LiquidationRecord, ManipulatorAction,
    StrategyDetails, StrategyKind, StrategyResult,
};
